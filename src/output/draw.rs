// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/draw.rs - 姿态结果可视化
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use thiserror::Error;
use url::Url;

use crate::pose::Pose;

const KEYPOINT_RADIUS: i32 = 3;
const KEYPOINT_COLOR: [u8; 3] = [0, 255, 255]; // 青色
const SKELETON_COLOR: [u8; 3] = [255, 0, 0]; // 红色
const MIN_CONFIDENCE: f32 = 0.5;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DrawConfigError {
  #[error("参数 {name} 的值无效: {value}")]
  InvalidParameter { name: String, value: String },
}

/// 绘制关键点与骨架，只画得分不低于 `min_confidence` 的部分
#[derive(Debug, Clone, PartialEq)]
pub struct Draw {
  keypoint_radius: i32,
  keypoint_color: [u8; 3],
  skeleton_color: [u8; 3],
  min_confidence: f32,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      keypoint_radius: KEYPOINT_RADIUS,
      keypoint_color: KEYPOINT_COLOR,
      skeleton_color: SKELETON_COLOR,
      min_confidence: MIN_CONFIDENCE,
    }
  }
}

impl Draw {
  /// 读取 URL 中的 `min_confidence` 参数
  pub fn from_query(url: &Url) -> Result<Self, DrawConfigError> {
    let mut draw = Draw::default();
    for (key, value) in url.query_pairs() {
      if key == "min_confidence" {
        draw.min_confidence = value
          .parse()
          .map_err(|_| DrawConfigError::InvalidParameter {
            name: key.to_string(),
            value: value.to_string(),
          })?;
      }
    }
    Ok(draw)
  }

  pub fn min_confidence(mut self, min_confidence: f32) -> Self {
    self.min_confidence = min_confidence;
    self
  }

  pub fn draw_pose_on_image(&self, image: &mut RgbImage, pose: &Pose) {
    for (a, b) in pose.adjacent_keypoints(self.min_confidence) {
      draw_line_segment_mut(
        image,
        (a.position.x, a.position.y),
        (b.position.x, b.position.y),
        Rgb(self.skeleton_color),
      );
    }

    for keypoint in pose
      .keypoints
      .iter()
      .filter(|k| k.score >= self.min_confidence)
    {
      draw_filled_circle_mut(
        image,
        (
          keypoint.position.x.round() as i32,
          keypoint.position.y.round() as i32,
        ),
        self.keypoint_radius,
        Rgb(self.keypoint_color),
      );
    }
  }

  pub fn draw_poses(&self, image: &RgbImage, poses: &[Pose]) -> RgbImage {
    let mut image = image.clone();
    for pose in poses {
      self.draw_pose_on_image(&mut image, pose);
    }
    image
  }
}
