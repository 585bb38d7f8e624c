// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/checkpoint.rs - 预训练权重表
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

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::model::{Architecture, PoseNetError, QuantBytes};

pub const CHECKPOINT_BASE_URL: &str = "https://storage.googleapis.com/tfjs-models/savedmodel/posenet";
const MULTIPLIER_EPSILON: f32 = 1e-3;

/// 一组预训练权重
#[derive(Debug, PartialEq)]
pub struct Checkpoint {
  pub name: &'static str,
  pub architecture: Architecture,
  pub multiplier: f32,
  /// 相对于权重仓库根目录的路径
  pub path: &'static str,
}

pub static CHECKPOINTS: [Checkpoint; 4] = [
  Checkpoint {
    name: "mobilenet_v1_050",
    architecture: Architecture::MobileNetV1,
    multiplier: 0.50,
    path: "mobilenet/{quant}/050",
  },
  Checkpoint {
    name: "mobilenet_v1_075",
    architecture: Architecture::MobileNetV1,
    multiplier: 0.75,
    path: "mobilenet/{quant}/075",
  },
  Checkpoint {
    name: "mobilenet_v1_100",
    architecture: Architecture::MobileNetV1,
    multiplier: 1.00,
    path: "mobilenet/{quant}/100",
  },
  Checkpoint {
    name: "resnet50_100",
    architecture: Architecture::ResNet50,
    multiplier: 1.00,
    path: "resnet50/{quant}",
  },
];

pub fn find(architecture: Architecture, multiplier: f32) -> Option<&'static Checkpoint> {
  CHECKPOINTS.iter().find(|c| {
    c.architecture == architecture && (c.multiplier - multiplier).abs() < MULTIPLIER_EPSILON
  })
}

/// 确定了输出步长与量化方式的权重
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedCheckpoint {
  pub checkpoint: &'static Checkpoint,
  pub output_stride: u32,
  pub quant_bytes: QuantBytes,
}

impl ResolvedCheckpoint {
  fn relative_dir(&self) -> String {
    self
      .checkpoint
      .path
      .replace("{quant}", self.quant_bytes.dir_name())
  }

  /// 原始权重的下载地址
  pub fn source_url(&self) -> String {
    format!(
      "{}/{}/model-stride{}.json",
      CHECKPOINT_BASE_URL,
      self.relative_dir(),
      self.output_stride
    )
  }

  /// 转换后的本地模型文件名
  pub fn file_name(&self) -> String {
    format!(
      "{}-{}-stride{}.rknn",
      self.checkpoint.name,
      self.quant_bytes.dir_name(),
      self.output_stride
    )
  }
}

/// 权重来源
pub trait CheckpointStore {
  fn fetch(&self, checkpoint: &ResolvedCheckpoint) -> Result<Vec<u8>, PoseNetError>;
}

/// 从本地目录按文件名读取权重
#[derive(Debug, Clone)]
pub struct DirectoryStore {
  root: PathBuf,
}

impl DirectoryStore {
  pub fn new(root: impl AsRef<Path>) -> Self {
    Self {
      root: root.as_ref().to_path_buf(),
    }
  }

  pub fn path_of(&self, checkpoint: &ResolvedCheckpoint) -> PathBuf {
    self.root.join(checkpoint.file_name())
  }
}

impl CheckpointStore for DirectoryStore {
  fn fetch(&self, checkpoint: &ResolvedCheckpoint) -> Result<Vec<u8>, PoseNetError> {
    let path = self.path_of(checkpoint);
    info!("加载权重文件: {}", path.display());
    debug!("权重来源: {}", checkpoint.source_url());

    let data = std::fs::read(&path).map_err(|source| PoseNetError::CheckpointIo {
      path: path.clone(),
      source,
    })?;
    debug!(
      "权重文件大小: {:.2} MB",
      data.len() as f64 / (1024.0 * 1024.0)
    );
    Ok(data)
  }
}
