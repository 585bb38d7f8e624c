// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/config.rs - 模型配置与校验
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

use std::{fmt, str::FromStr};

use thiserror::Error;
use tracing::error;
use url::Url;

use crate::FromUrl;
use crate::model::checkpoint::{self, Checkpoint};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
  #[error("不支持的模型结构: {0}")]
  UnsupportedArchitecture(String),
  #[error("{architecture} 不支持输出步长 {stride}, 可选值: {supported:?}")]
  UnsupportedOutputStride {
    architecture: Architecture,
    stride: u32,
    supported: &'static [u32],
  },
  #[error("输入分辨率 {resolution} 与输出步长 {stride} 不匹配, 需满足 (分辨率 - 1) % 步长 == 0")]
  UnsupportedInputResolution { resolution: u32, stride: u32 },
  #[error("{architecture} 没有倍率为 {multiplier} 的预训练权重")]
  UnsupportedMultiplier {
    architecture: Architecture,
    multiplier: f32,
  },
  #[error("不支持的量化字节数: {0}, 可选值: 1, 2, 4")]
  UnsupportedQuantBytes(u8),
  #[error("参数 {name} 的值无效: {value}")]
  InvalidParameter { name: String, value: String },
  #[error("最大检测数必须大于 0, 实际为 {0}")]
  InvalidMaxDetections(usize),
  #[error("得分阈值必须位于 [0, 1], 实际为 {0}")]
  InvalidScoreThreshold(f32),
  #[error("NMS 半径必须大于 0, 实际为 {0}")]
  InvalidNmsRadius(f32),
}

/// 主干网络结构
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Architecture {
  MobileNetV1,
  ResNet50,
}

impl Architecture {
  pub fn supported_output_strides(self) -> &'static [u32] {
    match self {
      Architecture::MobileNetV1 => &[8, 16],
      Architecture::ResNet50 => &[16, 32],
    }
  }

  pub fn default_multiplier(self) -> f32 {
    match self {
      Architecture::MobileNetV1 => 0.75,
      Architecture::ResNet50 => 1.0,
    }
  }

  /// URL 方案名
  pub fn scheme(self) -> &'static str {
    match self {
      Architecture::MobileNetV1 => "mobilenet-v1",
      Architecture::ResNet50 => "resnet50",
    }
  }
}

impl fmt::Display for Architecture {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Architecture::MobileNetV1 => write!(f, "MobileNetV1"),
      Architecture::ResNet50 => write!(f, "ResNet50"),
    }
  }
}

impl FromStr for Architecture {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_ascii_lowercase().replace('-', "_").as_str() {
      "mobilenet_v1" | "mobilenetv1" | "mobilenet" => Ok(Architecture::MobileNetV1),
      "resnet50" | "resnet_50" | "resnet" => Ok(Architecture::ResNet50),
      _ => Err(ConfigError::UnsupportedArchitecture(s.to_string())),
    }
  }
}

/// 模型输入分辨率
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputResolution {
  pub width: u32,
  pub height: u32,
}

impl InputResolution {
  pub const fn square(size: u32) -> Self {
    Self {
      width: size,
      height: size,
    }
  }

  pub fn is_valid_for(size: u32, output_stride: u32) -> bool {
    size > 0 && output_stride > 0 && (size - 1) % output_stride == 0
  }

  /// 输出特征图尺寸 (高, 宽)
  pub fn output_shape(self, output_stride: u32) -> (usize, usize) {
    (
      ((self.height - 1) / output_stride + 1) as usize,
      ((self.width - 1) / output_stride + 1) as usize,
    )
  }
}

/// 权重量化字节数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuantBytes {
  One = 1,
  Two = 2,
  Four = 4,
}

impl TryFrom<u8> for QuantBytes {
  type Error = ConfigError;

  fn try_from(value: u8) -> Result<Self, Self::Error> {
    match value {
      1 => Ok(QuantBytes::One),
      2 => Ok(QuantBytes::Two),
      4 => Ok(QuantBytes::Four),
      _ => Err(ConfigError::UnsupportedQuantBytes(value)),
    }
  }
}

impl QuantBytes {
  /// 权重存放目录名
  pub fn dir_name(self) -> &'static str {
    match self {
      QuantBytes::One => "quant1",
      QuantBytes::Two => "quant2",
      QuantBytes::Four => "float",
    }
  }
}

/// 模型配置
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelConfig {
  pub architecture: Architecture,
  pub output_stride: u32,
  pub input_resolution: InputResolution,
  /// 为空时使用结构的默认倍率
  pub multiplier: Option<f32>,
  pub quant_bytes: QuantBytes,
}

pub const MOBILENET_V1_CONFIG: ModelConfig = ModelConfig {
  architecture: Architecture::MobileNetV1,
  output_stride: 16,
  input_resolution: InputResolution::square(257),
  multiplier: Some(0.75),
  quant_bytes: QuantBytes::Four,
};

pub const RESNET50_CONFIG: ModelConfig = ModelConfig {
  architecture: Architecture::ResNet50,
  output_stride: 32,
  input_resolution: InputResolution::square(257),
  multiplier: Some(1.0),
  quant_bytes: QuantBytes::Four,
};

impl ModelConfig {
  pub fn defaults_for(architecture: Architecture) -> Self {
    match architecture {
      Architecture::MobileNetV1 => MOBILENET_V1_CONFIG,
      Architecture::ResNet50 => RESNET50_CONFIG,
    }
  }

  pub fn multiplier(&self) -> f32 {
    self
      .multiplier
      .unwrap_or_else(|| self.architecture.default_multiplier())
  }

  /// 校验配置并返回对应的预训练权重
  pub fn validate(&self) -> Result<&'static Checkpoint, ConfigError> {
    let supported = self.architecture.supported_output_strides();
    if !supported.contains(&self.output_stride) {
      error!(
        "{} 不支持输出步长 {}",
        self.architecture, self.output_stride
      );
      return Err(ConfigError::UnsupportedOutputStride {
        architecture: self.architecture,
        stride: self.output_stride,
        supported,
      });
    }

    for size in [self.input_resolution.width, self.input_resolution.height] {
      if !InputResolution::is_valid_for(size, self.output_stride) {
        error!("输入分辨率 {} 与输出步长 {} 不匹配", size, self.output_stride);
        return Err(ConfigError::UnsupportedInputResolution {
          resolution: size,
          stride: self.output_stride,
        });
      }
    }

    let multiplier = self.multiplier();
    checkpoint::find(self.architecture, multiplier).ok_or_else(|| {
      error!("{} 没有倍率为 {} 的权重", self.architecture, multiplier);
      ConfigError::UnsupportedMultiplier {
        architecture: self.architecture,
        multiplier,
      }
    })
  }
}

fn parse_param<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
  value.parse().map_err(|_| ConfigError::InvalidParameter {
    name: name.to_string(),
    value: value.to_string(),
  })
}

impl FromUrl for ModelConfig {
  type Error = ConfigError;

  /// 形如 `mobilenet-v1:///models?stride=16&resolution=257&multiplier=0.75&quant=4`，
  /// 未给出的参数取该结构的默认值
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    let architecture: Architecture = url.scheme().parse()?;
    let mut config = ModelConfig::defaults_for(architecture);

    for (key, value) in url.query_pairs() {
      match key.as_ref() {
        "stride" | "output_stride" => config.output_stride = parse_param(&key, &value)?,
        "resolution" => {
          config.input_resolution = InputResolution::square(parse_param(&key, &value)?)
        }
        "width" => config.input_resolution.width = parse_param(&key, &value)?,
        "height" => config.input_resolution.height = parse_param(&key, &value)?,
        "multiplier" => config.multiplier = Some(parse_param(&key, &value)?),
        "quant" | "quant_bytes" => {
          config.quant_bytes = QuantBytes::try_from(parse_param::<u8>(&key, &value)?)?
        }
        _ => {
          return Err(ConfigError::InvalidParameter {
            name: key.to_string(),
            value: value.to_string(),
          });
        }
      }
    }

    config.validate()?;
    Ok(config)
  }
}
