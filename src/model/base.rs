// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/base.rs - 主干网络
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
use tracing::{debug, info, warn};

use crate::{
  frame::{InputTensor, pad_and_resize},
  model::{
    Architecture, InputResolution, Model, ModelConfig, ModelOutputs, PoseNetError,
    mobilenet::MobileNet, resnet::ResNet,
  },
  runtime::Session,
};

/// 两种结构共享的会话持有与推理流程
pub(crate) struct Backbone<S> {
  session: Option<S>,
  output_stride: u32,
  input_resolution: InputResolution,
}

impl<S: Session> Backbone<S> {
  pub(crate) fn new(session: S, output_stride: u32, input_resolution: InputResolution) -> Self {
    Self {
      session: Some(session),
      output_stride,
      input_resolution,
    }
  }

  pub(crate) fn check_input(&self, image: &RgbImage) -> Result<(), PoseNetError> {
    let (width, height) = image.dimensions();
    if width != self.input_resolution.width || height != self.input_resolution.height {
      return Err(PoseNetError::InputSizeMismatch {
        expected: (self.input_resolution.width, self.input_resolution.height),
        actual: (width, height),
      });
    }
    Ok(())
  }

  pub(crate) fn run(&self, input: InputTensor) -> Result<ModelOutputs, PoseNetError> {
    let session = self.session.as_ref().ok_or(PoseNetError::ModelDisposed)?;

    debug!("执行模型推理");
    let raw = session
      .run(&input)
      .map_err(|e| PoseNetError::Runtime(Box::new(e)))?;

    let (height, width) = self.input_resolution.output_shape(self.output_stride);
    ModelOutputs::from_raw(raw, height, width)
  }

  pub(crate) fn dispose(&mut self) {
    if self.session.take().is_some() {
      info!("推理会话已释放");
    } else {
      warn!("推理会话已经释放过");
    }
  }

  pub(crate) fn is_disposed(&self) -> bool {
    self.session.is_none()
  }
}

/// 已加载的主干网络，加载时按配置选定结构
pub enum BaseModel<S> {
  MobileNetV1(MobileNet<S>),
  ResNet50(ResNet<S>),
}

impl<S: Session> BaseModel<S> {
  /// 校验配置后包装已加载的会话
  pub fn new(config: &ModelConfig, session: S) -> Result<Self, PoseNetError> {
    config.validate()?;
    let backbone = Backbone::new(session, config.output_stride, config.input_resolution);
    Ok(match config.architecture {
      Architecture::MobileNetV1 => BaseModel::MobileNetV1(MobileNet::new(backbone)),
      Architecture::ResNet50 => BaseModel::ResNet50(ResNet::new(backbone)),
    })
  }

  fn backbone(&self) -> &Backbone<S> {
    match self {
      BaseModel::MobileNetV1(model) => model.backbone(),
      BaseModel::ResNet50(model) => model.backbone(),
    }
  }

  pub fn architecture(&self) -> Architecture {
    match self {
      BaseModel::MobileNetV1(_) => Architecture::MobileNetV1,
      BaseModel::ResNet50(_) => Architecture::ResNet50,
    }
  }

  pub fn output_stride(&self) -> u32 {
    self.backbone().output_stride
  }

  pub fn input_resolution(&self) -> InputResolution {
    self.backbone().input_resolution
  }

  /// 对已缩放到输入分辨率的图像执行前向推理
  pub fn predict(&self, image: &RgbImage) -> Result<ModelOutputs, PoseNetError> {
    match self {
      BaseModel::MobileNetV1(model) => model.predict(image),
      BaseModel::ResNet50(model) => model.predict(image),
    }
  }

  /// 释放推理会话，可重复调用
  pub fn dispose(&mut self) {
    match self {
      BaseModel::MobileNetV1(model) => model.dispose(),
      BaseModel::ResNet50(model) => model.dispose(),
    }
  }

  pub fn is_disposed(&self) -> bool {
    self.backbone().is_disposed()
  }
}

impl<S: Session> Model for BaseModel<S> {
  type Input = RgbImage;
  type Output = ModelOutputs;
  type Error = PoseNetError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let frame = pad_and_resize(input, self.input_resolution());
    self.predict(&frame.image)
  }
}
