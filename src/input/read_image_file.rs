// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use image::{ImageReader, RgbImage};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像加载错误: {0}")]
  ImageLoadError(#[from] image::ImageError),
}

/// 读取单张图像，迭代时只产出一次
pub struct ImageFileInput {
  image: Option<RgbImage>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI 方案不匹配: 期望 '{}', 实际 '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemeMismatch(url.scheme().to_string()));
    }

    let path = url.path();
    let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    debug!("读取图像 {}: {}x{}", path, image.width(), image.height());

    Ok(ImageFileInput {
      image: Some(image.into_rgb8()),
    })
  }
}

impl From<RgbImage> for ImageFileInput {
  fn from(image: RgbImage) -> Self {
    ImageFileInput { image: Some(image) }
  }
}

impl Iterator for ImageFileInput {
  type Item = RgbImage;

  fn next(&mut self) -> Option<Self::Item> {
    self.image.take()
  }
}
