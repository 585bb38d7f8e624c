// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/outputs.rs - 模型输出张量
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use tracing::{debug, error};

use crate::{model::PoseNetError, pose::NUM_KEYPOINTS};

const OFFSET_CHANNELS: usize = 2 * NUM_KEYPOINTS;
/// 16 条骨架边，每条边 (dy, dx)
const DISPLACEMENT_CHANNELS: usize = 32;

/// `[高, 宽, 通道]` 排列的输出张量
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTensor {
  shape: [usize; 3],
  data: Box<[f32]>,
}

impl OutputTensor {
  pub fn new(shape: [usize; 3], data: Box<[f32]>) -> Result<Self, PoseNetError> {
    let expected = shape.iter().product::<usize>();
    if data.len() != expected {
      return Err(PoseNetError::OutputMismatch(format!(
        "张量形状 {:?} 需要 {} 个元素, 实际为 {}",
        shape,
        expected,
        data.len()
      )));
    }
    Ok(Self { shape, data })
  }

  pub fn shape(&self) -> [usize; 3] {
    self.shape
  }

  pub fn get(&self, y: usize, x: usize, c: usize) -> f32 {
    let [_, width, channels] = self.shape;
    self.data[(y * width + x) * channels + c]
  }

  pub fn as_slice(&self) -> &[f32] {
    &self.data
  }

  fn map_in_place(&mut self, f: impl Fn(f32) -> f32) {
    self.data.iter_mut().for_each(|v| *v = f(*v));
  }
}

/// 一次前向推理得到的四个输出
#[derive(Debug, Clone, PartialEq)]
pub struct ModelOutputs {
  /// 已经过 sigmoid 的关键点热力图
  pub heatmap_scores: OutputTensor,
  pub offsets: OutputTensor,
  pub displacement_fwd: OutputTensor,
  pub displacement_bwd: OutputTensor,
}

impl ModelOutputs {
  /// 按元素数量匹配运行时输出：热力图、偏移与两路位移场。
  /// 两路位移场元素数量相同，保持运行时顺序（前向在前）。
  pub fn from_raw(raw: Vec<Box<[f32]>>, height: usize, width: usize) -> Result<Self, PoseNetError> {
    if raw.len() != 4 {
      error!("预期 4 个模型输出, 实际为 {}", raw.len());
      return Err(PoseNetError::OutputMismatch(format!(
        "预期 4 个模型输出, 实际为 {}",
        raw.len()
      )));
    }

    let spatial = height * width;
    let mut heatmaps = None;
    let mut offsets = None;
    let mut displacements = Vec::with_capacity(2);

    for (idx, data) in raw.into_iter().enumerate() {
      let len = data.len();
      debug!("输出 {}: 元素数量 {}", idx, len);
      if len == NUM_KEYPOINTS * spatial && heatmaps.is_none() {
        heatmaps = Some(OutputTensor::new([height, width, NUM_KEYPOINTS], data)?);
      } else if len == OFFSET_CHANNELS * spatial && offsets.is_none() {
        offsets = Some(OutputTensor::new([height, width, OFFSET_CHANNELS], data)?);
      } else if len == DISPLACEMENT_CHANNELS * spatial && displacements.len() < 2 {
        displacements.push(OutputTensor::new(
          [height, width, DISPLACEMENT_CHANNELS],
          data,
        )?);
      } else {
        error!(
          "输出 {} 大小不匹配: {}, 特征图大小 {}x{}",
          idx, len, height, width
        );
        return Err(PoseNetError::OutputMismatch(format!(
          "输出 {} 的元素数量 {} 无法对应到 {}x{} 的特征图",
          idx, len, height, width
        )));
      }
    }

    let mut displacements = displacements.into_iter();
    match (heatmaps, offsets, displacements.next(), displacements.next()) {
      (Some(mut heatmap_scores), Some(offsets), Some(displacement_fwd), Some(displacement_bwd)) => {
        heatmap_scores.map_in_place(sigmoid);
        Ok(Self {
          heatmap_scores,
          offsets,
          displacement_fwd,
          displacement_bwd,
        })
      }
      _ => Err(PoseNetError::OutputMismatch(
        "模型输出缺少热力图、偏移或位移场".to_string(),
      )),
    }
  }

  /// 特征图尺寸 (高, 宽)
  pub fn grid_shape(&self) -> (usize, usize) {
    let [height, width, _] = self.heatmap_scores.shape();
    (height, width)
  }
}

fn sigmoid(x: f32) -> f32 {
  1.0 / (1.0 + (-x).exp())
}
