// 该文件是 Shanan （山南西风） 项目的一部分。
// src/pose.rs - 姿态与关键点定义
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

use serde::Serialize;

/// PoseNet 关键点数量
pub const NUM_KEYPOINTS: usize = 17;

/// 关键点名称，顺序与模型输出通道一致
pub const PART_NAMES: [&str; NUM_KEYPOINTS] = [
  "nose",
  "leftEye",
  "rightEye",
  "leftEar",
  "rightEar",
  "leftShoulder",
  "rightShoulder",
  "leftElbow",
  "rightElbow",
  "leftWrist",
  "rightWrist",
  "leftHip",
  "rightHip",
  "leftKnee",
  "rightKnee",
  "leftAnkle",
  "rightAnkle",
];

/// 人体部位编号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PartId {
  Nose = 0,
  LeftEye = 1,
  RightEye = 2,
  LeftEar = 3,
  RightEar = 4,
  LeftShoulder = 5,
  RightShoulder = 6,
  LeftElbow = 7,
  RightElbow = 8,
  LeftWrist = 9,
  RightWrist = 10,
  LeftHip = 11,
  RightHip = 12,
  LeftKnee = 13,
  RightKnee = 14,
  LeftAnkle = 15,
  RightAnkle = 16,
}

impl PartId {
  pub const ALL: [PartId; NUM_KEYPOINTS] = [
    PartId::Nose,
    PartId::LeftEye,
    PartId::RightEye,
    PartId::LeftEar,
    PartId::RightEar,
    PartId::LeftShoulder,
    PartId::RightShoulder,
    PartId::LeftElbow,
    PartId::RightElbow,
    PartId::LeftWrist,
    PartId::RightWrist,
    PartId::LeftHip,
    PartId::RightHip,
    PartId::LeftKnee,
    PartId::RightKnee,
    PartId::LeftAnkle,
    PartId::RightAnkle,
  ];

  pub fn name(self) -> &'static str {
    PART_NAMES[self as usize]
  }
}

impl TryFrom<usize> for PartId {
  type Error = usize;

  fn try_from(value: usize) -> Result<Self, Self::Error> {
    PartId::ALL.get(value).copied().ok_or(value)
  }
}

/// 骨架连线
pub const CONNECTED_PARTS: [(PartId, PartId); 12] = [
  (PartId::LeftHip, PartId::LeftShoulder),
  (PartId::LeftElbow, PartId::LeftShoulder),
  (PartId::LeftElbow, PartId::LeftWrist),
  (PartId::LeftHip, PartId::LeftKnee),
  (PartId::LeftKnee, PartId::LeftAnkle),
  (PartId::RightHip, PartId::RightShoulder),
  (PartId::RightElbow, PartId::RightShoulder),
  (PartId::RightElbow, PartId::RightWrist),
  (PartId::RightHip, PartId::RightKnee),
  (PartId::RightKnee, PartId::RightAnkle),
  (PartId::LeftShoulder, PartId::RightShoulder),
  (PartId::LeftHip, PartId::RightHip),
];

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Position {
  pub x: f32,
  pub y: f32,
}

impl Position {
  pub fn new(x: f32, y: f32) -> Self {
    Self { x, y }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Keypoint {
  pub part: PartId,
  pub position: Position,
  pub score: f32,
}

/// 单人姿态：按部位顺序排列的关键点与整体得分
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pose {
  pub keypoints: Vec<Keypoint>,
  pub score: f32,
}

impl Pose {
  pub fn keypoint(&self, part: PartId) -> Option<&Keypoint> {
    self.keypoints.iter().find(|k| k.part == part)
  }

  /// 返回 [x_min, y_min, x_max, y_max]，无关键点时返回 None
  pub fn bounding_box(&self) -> Option<[f32; 4]> {
    if self.keypoints.is_empty() {
      return None;
    }

    let init = [f32::MAX, f32::MAX, f32::MIN, f32::MIN];
    let bbox = self.keypoints.iter().fold(init, |b, k| {
      [
        b[0].min(k.position.x),
        b[1].min(k.position.y),
        b[2].max(k.position.x),
        b[3].max(k.position.y),
      ]
    });
    Some(bbox)
  }

  /// 两端关键点得分均不低于 `min_confidence` 的骨架连线
  pub fn adjacent_keypoints(&self, min_confidence: f32) -> Vec<(Keypoint, Keypoint)> {
    CONNECTED_PARTS
      .iter()
      .filter_map(|&(a, b)| {
        let ka = self.keypoint(a)?;
        let kb = self.keypoint(b)?;
        (ka.score >= min_confidence && kb.score >= min_confidence).then_some((*ka, *kb))
      })
      .collect()
  }
}
