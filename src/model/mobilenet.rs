// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/mobilenet.rs - MobileNetV1 主干
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

use image::RgbImage;

use crate::{
  frame::InputTensor,
  model::{ModelOutputs, PoseNetError, base::Backbone},
  runtime::Session,
};

pub struct MobileNet<S> {
  backbone: Backbone<S>,
}

impl<S: Session> MobileNet<S> {
  pub(crate) fn new(backbone: Backbone<S>) -> Self {
    Self { backbone }
  }

  pub(crate) fn backbone(&self) -> &Backbone<S> {
    &self.backbone
  }

  /// 像素值映射到 [-1, 1]
  pub fn preprocess(image: &RgbImage) -> InputTensor {
    InputTensor::from_image(image, |_, value| value as f32 / 127.5 - 1.0)
  }

  pub fn predict(&self, image: &RgbImage) -> Result<ModelOutputs, PoseNetError> {
    self.backbone.check_input(image)?;
    self.backbone.run(Self::preprocess(image))
  }

  pub fn dispose(&mut self) {
    self.backbone.dispose();
  }
}
