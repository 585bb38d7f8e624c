// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model.rs - 模型
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use thiserror::Error;

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

#[derive(Error, Debug)]
pub enum PoseNetError {
  #[error("配置错误: {0}")]
  Config(#[from] ConfigError),
  #[error("读取权重文件 {path} 失败: {source}")]
  CheckpointIo {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
  #[error("推理运行时错误: {0}")]
  Runtime(Box<dyn std::error::Error + Send + Sync>),
  #[error("模型输出不匹配: {0}")]
  OutputMismatch(String),
  #[error("输入尺寸不匹配: 预期 {expected:?}, 实际 {actual:?}")]
  InputSizeMismatch {
    expected: (u32, u32),
    actual: (u32, u32),
  },
  #[error("模型已释放")]
  ModelDisposed,
  #[error("输入图像为空")]
  EmptyImage,
}

mod base;
mod checkpoint;
mod config;
mod decode;
mod inference;
mod mobilenet;
mod outputs;
mod posenet;
mod rescale;
mod resnet;

pub use self::base::BaseModel;
pub use self::checkpoint::{
  CHECKPOINT_BASE_URL, CHECKPOINTS, Checkpoint, CheckpointStore, DirectoryStore, ResolvedCheckpoint,
};
pub use self::config::{
  Architecture, ConfigError, InputResolution, MOBILENET_V1_CONFIG, ModelConfig, QuantBytes,
  RESNET50_CONFIG,
};
pub use self::decode::{PoseDecoder, decode_poses};
pub use self::inference::{
  InferenceConfig, MULTI_PERSON_INFERENCE_CONFIG, SINGLE_PERSON_INFERENCE_CONFIG,
};
pub use self::mobilenet::MobileNet;
pub use self::outputs::{ModelOutputs, OutputTensor};
pub use self::posenet::{PoseNet, PoseNetBuilder};
pub use self::rescale::{flip_pose_horizontal, scale_and_flip_poses, scale_pose};
pub use self::resnet::ResNet;
