// 该文件是 Shanan （山南西风） 项目的一部分。
// src/frame.rs - 模型输入帧定义
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

use image::{RgbImage, imageops::FilterType};
use tracing::debug;

use crate::model::InputResolution;

const RGB_CHANNELS: usize = 3;

/// 缩放前在原图四周补齐的像素数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Padding {
  pub top: u32,
  pub bottom: u32,
  pub left: u32,
  pub right: u32,
}

/// 补边并缩放到模型输入分辨率后的帧
#[derive(Debug, Clone)]
pub struct PaddedFrame {
  pub image: RgbImage,
  pub padding: Padding,
}

/// 计算将 `width x height` 的图像补齐到目标宽高比所需的边距，
/// 边距在两侧平均分配
pub fn padding_for(width: u32, height: u32, resolution: InputResolution) -> Padding {
  let target_aspect = resolution.width as f32 / resolution.height as f32;
  let aspect = width as f32 / height as f32;

  if aspect < target_aspect {
    let pad = (0.5 * (target_aspect * height as f32 - width as f32)).round() as u32;
    Padding {
      left: pad,
      right: pad,
      ..Padding::default()
    }
  } else {
    let pad = (0.5 * (width as f32 / target_aspect - height as f32)).round() as u32;
    Padding {
      top: pad,
      bottom: pad,
      ..Padding::default()
    }
  }
}

/// 补黑边后双线性缩放到模型输入分辨率
pub fn pad_and_resize(image: &RgbImage, resolution: InputResolution) -> PaddedFrame {
  let (width, height) = image.dimensions();
  let padding = padding_for(width, height, resolution);

  let mut canvas = RgbImage::new(
    width + padding.left + padding.right,
    height + padding.top + padding.bottom,
  );
  image::imageops::overlay(
    &mut canvas,
    image,
    padding.left as i64,
    padding.top as i64,
  );

  debug!(
    "输入图像 {}x{}, 补边 {:?}, 缩放到 {}x{}",
    width, height, padding, resolution.width, resolution.height
  );

  let image = image::imageops::resize(
    &canvas,
    resolution.width,
    resolution.height,
    FilterType::Triangle,
  );

  PaddedFrame { image, padding }
}

/// NHWC 排列的浮点输入张量（批大小为 1）
#[derive(Debug, Clone)]
pub struct InputTensor {
  width: usize,
  height: usize,
  data: Box<[f32]>,
}

impl InputTensor {
  /// 按像素逐通道映射，`normalize` 接收通道下标与像素值
  pub fn from_image<F>(image: &RgbImage, normalize: F) -> Self
  where
    F: Fn(usize, u8) -> f32,
  {
    let (width, height) = image.dimensions();
    let data = image
      .pixels()
      .flat_map(|pixel| pixel.0.into_iter().enumerate())
      .map(|(c, value)| normalize(c, value))
      .collect::<Vec<_>>();

    Self {
      width: width as usize,
      height: height as usize,
      data: data.into_boxed_slice(),
    }
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn channels(&self) -> usize {
    RGB_CHANNELS
  }

  pub fn as_nhwc(&self) -> &[f32] {
    &self.data
  }
}
