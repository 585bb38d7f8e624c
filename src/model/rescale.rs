// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/rescale.rs - 坐标还原与水平翻转
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

use crate::{
  frame::Padding,
  model::InputResolution,
  pose::{Keypoint, Pose, Position},
};

fn map_positions(pose: &Pose, f: impl Fn(Position) -> Position) -> Pose {
  Pose {
    keypoints: pose
      .keypoints
      .iter()
      .map(|k| Keypoint {
        position: f(k.position),
        ..*k
      })
      .collect(),
    score: pose.score,
  }
}

/// `position * scale + offset`
pub fn scale_pose(pose: &Pose, scale_y: f32, scale_x: f32, offset_y: f32, offset_x: f32) -> Pose {
  map_positions(pose, |p| Position {
    x: p.x * scale_x + offset_x,
    y: p.y * scale_y + offset_y,
  })
}

/// 以图像宽度做水平镜像
pub fn flip_pose_horizontal(pose: &Pose, image_width: u32) -> Pose {
  map_positions(pose, |p| Position {
    x: image_width as f32 - 1.0 - p.x,
    y: p.y,
  })
}

/// 将模型输入空间中的姿态还原到原图像素空间。
/// `image_size` 为原图 (高, 宽)。
pub fn scale_and_flip_poses(
  poses: Vec<Pose>,
  image_size: (u32, u32),
  resolution: InputResolution,
  padding: Padding,
  flip_horizontal: bool,
) -> Vec<Pose> {
  let (height, width) = image_size;
  let scale_y = (height + padding.top + padding.bottom) as f32 / resolution.height as f32;
  let scale_x = (width + padding.left + padding.right) as f32 / resolution.width as f32;

  poses
    .iter()
    .map(|pose| {
      let scaled = scale_pose(
        pose,
        scale_y,
        scale_x,
        -(padding.top as f32),
        -(padding.left as f32),
      );
      if flip_horizontal {
        flip_pose_horizontal(&scaled, width)
      } else {
        scaled
      }
    })
    .collect()
}
