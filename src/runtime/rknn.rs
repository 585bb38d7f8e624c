// 该文件是 Shanan （山南西风） 项目的一部分。
// src/runtime/rknn.rs - RKNN 推理运行时
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use rknpu::{Context, InitFlags, TensorFormat, TensorType};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::{
  frame::InputTensor,
  runtime::{Runtime, Session},
};

const POSENET_NUM_INPUTS: u32 = 1;
const POSENET_NUM_OUTPUTS: u32 = 4;

#[derive(Error, Debug)]
pub enum RknnError {
  #[error("RKNN 错误: {0}")]
  RknnError(#[from] rknpu::Error),
  #[error("模型无效: {0}")]
  ModelInvalid(String),
  #[error("获取第 {0} 个输出失败: {1}")]
  OutputError(usize, String),
}

#[derive(Debug, Default)]
pub struct RknnRuntime;

impl Runtime for RknnRuntime {
  type Session = RknnSession;
  type Error = RknnError;

  fn load(&self, model_data: &[u8]) -> Result<Self::Session, Self::Error> {
    info!("创建 RKNN 推理上下文");
    let context = Context::new(model_data, InitFlags::default())?;

    match context.sdk_version() {
      Ok(version) => {
        if let Ok(api_ver) = version.api_version() {
          debug!("模型 API 版本: {}", api_ver);
        }
        if let Ok(drv_ver) = version.driver_version() {
          debug!("模型驱动版本: {}", drv_ver);
        }
      }
      Err(e) => {
        error!("查询 SDK 版本失败: {}", e);
        return Err(RknnError::RknnError(e));
      }
    }

    let num_inputs = context.num_inputs()?;
    let num_outputs = context.num_outputs()?;
    debug!("模型输入数量: {}", num_inputs);
    debug!("模型输出数量: {}", num_outputs);

    if num_inputs != POSENET_NUM_INPUTS || num_outputs != POSENET_NUM_OUTPUTS {
      let msg = format!(
        "预期模型输入/输出数量为 {}/{}, 实际为 {}/{}",
        POSENET_NUM_INPUTS, POSENET_NUM_OUTPUTS, num_inputs, num_outputs
      );
      error!("{}", msg);
      return Err(RknnError::ModelInvalid(msg));
    }

    info!("RKNN 上下文创建完成");
    Ok(RknnSession {
      context,
      num_outputs: num_outputs as usize,
    })
  }
}

pub struct RknnSession {
  context: Context,
  num_outputs: usize,
}

impl Session for RknnSession {
  type Error = RknnError;

  fn run(&self, input: &InputTensor) -> Result<Vec<Box<[f32]>>, Self::Error> {
    debug!(
      "设置模型输入: {}x{}x{}",
      input.height(),
      input.width(),
      input.channels()
    );
    self.context.set_input(
      0,
      bytemuck::cast_slice(input.as_nhwc()),
      TensorFormat::NHWC,
      TensorType::Float32,
    )?;

    debug!("执行模型推理");
    self.context.run()?;

    let output = self.context.get_outputs()?;
    (0..self.num_outputs)
      .map(|idx| {
        output
          .get_f32(idx)
          .map(|data| data.to_vec().into_boxed_slice())
          .map_err(|e| RknnError::OutputError(idx, e.to_string()))
      })
      .collect()
  }
}
