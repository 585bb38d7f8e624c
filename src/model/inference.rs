// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/inference.rs - 推理配置
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

use tracing::error;

use crate::model::ConfigError;

/// 解码方式与后处理参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InferenceConfig {
  SinglePerson {
    flip_horizontal: bool,
  },
  MultiPerson {
    max_detections: usize,
    score_threshold: f32,
    nms_radius: f32,
    flip_horizontal: bool,
  },
}

pub const SINGLE_PERSON_INFERENCE_CONFIG: InferenceConfig = InferenceConfig::SinglePerson {
  flip_horizontal: false,
};

pub const MULTI_PERSON_INFERENCE_CONFIG: InferenceConfig = InferenceConfig::MultiPerson {
  max_detections: 5,
  score_threshold: 0.5,
  nms_radius: 20.0,
  flip_horizontal: false,
};

impl Default for InferenceConfig {
  fn default() -> Self {
    SINGLE_PERSON_INFERENCE_CONFIG
  }
}

impl InferenceConfig {
  pub fn flip_horizontal(&self) -> bool {
    match *self {
      InferenceConfig::SinglePerson { flip_horizontal }
      | InferenceConfig::MultiPerson {
        flip_horizontal, ..
      } => flip_horizontal,
    }
  }

  pub fn with_flip_horizontal(mut self, flip: bool) -> Self {
    match &mut self {
      InferenceConfig::SinglePerson { flip_horizontal }
      | InferenceConfig::MultiPerson {
        flip_horizontal, ..
      } => *flip_horizontal = flip,
    }
    self
  }

  pub fn validate(&self) -> Result<(), ConfigError> {
    if let InferenceConfig::MultiPerson {
      max_detections,
      score_threshold,
      nms_radius,
      ..
    } = *self
    {
      if max_detections == 0 {
        error!("最大检测数必须大于 0");
        return Err(ConfigError::InvalidMaxDetections(max_detections));
      }
      if !(0.0..=1.0).contains(&score_threshold) {
        error!("得分阈值 {} 不在 [0, 1] 内", score_threshold);
        return Err(ConfigError::InvalidScoreThreshold(score_threshold));
      }
      // NaN 同样不满足
      if !(nms_radius > 0.0) {
        error!("NMS 半径 {} 必须大于 0", nms_radius);
        return Err(ConfigError::InvalidNmsRadius(nms_radius));
      }
    }
    Ok(())
  }
}
