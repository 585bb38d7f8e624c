// 该文件是 Shanan （山南西风） 项目的一部分。
// src/runtime.rs - 推理运行时接口
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use crate::frame::InputTensor;

/// 已加载权重的推理会话
///
/// `run` 阻塞直到输出张量可在主机侧读取，每个输出以扁平数组返回，
/// 顺序与模型图的输出顺序一致。会话被丢弃时释放运行时资源。
pub trait Session {
  type Error: std::error::Error + Send + Sync + 'static;

  fn run(&self, input: &InputTensor) -> Result<Vec<Box<[f32]>>, Self::Error>;
}

/// 从权重数据创建会话
pub trait Runtime {
  type Session: Session;
  type Error: std::error::Error + Send + Sync + 'static;

  fn load(&self, model_data: &[u8]) -> Result<Self::Session, Self::Error>;
}

#[cfg(feature = "rknpu_runtime")]
mod rknn;
#[cfg(feature = "rknpu_runtime")]
pub use self::rknn::{RknnError, RknnRuntime, RknnSession};
