// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/decode.rs - 姿态解码分发
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

use tracing::debug;

use crate::{
  model::{InferenceConfig, ModelOutputs},
  pose::Pose,
};

/// 将模型输出解码为姿态的外部解码器。
/// 返回的坐标位于模型输入分辨率的像素空间。
pub trait PoseDecoder {
  fn decode_single(&self, outputs: &ModelOutputs, output_stride: u32) -> Pose;

  fn decode_multiple(
    &self,
    outputs: &ModelOutputs,
    output_stride: u32,
    max_detections: usize,
    score_threshold: f32,
    nms_radius: f32,
  ) -> Vec<Pose>;
}

impl<D: PoseDecoder + ?Sized> PoseDecoder for Box<D> {
  fn decode_single(&self, outputs: &ModelOutputs, output_stride: u32) -> Pose {
    (**self).decode_single(outputs, output_stride)
  }

  fn decode_multiple(
    &self,
    outputs: &ModelOutputs,
    output_stride: u32,
    max_detections: usize,
    score_threshold: f32,
    nms_radius: f32,
  ) -> Vec<Pose> {
    (**self).decode_multiple(
      outputs,
      output_stride,
      max_detections,
      score_threshold,
      nms_radius,
    )
  }
}

/// 按解码方式分发。多人模式下丢弃低于阈值的姿态，
/// 按得分降序最多保留 `max_detections` 个。
pub fn decode_poses<D: PoseDecoder + ?Sized>(
  decoder: &D,
  outputs: &ModelOutputs,
  output_stride: u32,
  config: &InferenceConfig,
) -> Vec<Pose> {
  match *config {
    InferenceConfig::SinglePerson { .. } => {
      debug!("单人解码");
      vec![decoder.decode_single(outputs, output_stride)]
    }
    InferenceConfig::MultiPerson {
      max_detections,
      score_threshold,
      nms_radius,
      ..
    } => {
      debug!(
        "多人解码: 最大检测数 {}, 得分阈值 {}, NMS 半径 {}",
        max_detections, score_threshold, nms_radius
      );
      let mut poses = decoder.decode_multiple(
        outputs,
        output_stride,
        max_detections,
        score_threshold,
        nms_radius,
      );
      let decoded = poses.len();

      poses.retain(|pose| pose.score >= score_threshold);
      poses.sort_by(|a, b| b.score.total_cmp(&a.score));
      poses.truncate(max_detections);

      if poses.len() != decoded {
        debug!("解码得到 {} 个姿态, 保留 {} 个", decoded, poses.len());
      }
      poses
    }
  }
}
