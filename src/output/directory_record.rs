// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU16, Ordering};

use chrono::{DateTime, Datelike, Utc};
use image::RgbImage;
use thiserror::Error;
use tracing::debug;

use crate::{
  FromUrl, FromUrlWithScheme,
  output::{
    Render,
    draw::{Draw, DrawConfigError},
  },
  pose::Pose,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("绘制参数错误: {0}")]
  DrawConfigError(#[from] DrawConfigError),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 保存原图并在旁边写入 JSON 格式的姿态
#[derive(Debug, Clone, Copy)]
pub struct Record;

impl Record {
  pub fn record(&self, poses: &[Pose], path: &Path) -> Result<(), DirectoryRecordOutputError> {
    let file = std::fs::File::create(path.with_extension("json"))?;
    serde_json::to_writer_pretty(std::io::BufWriter::new(file), poses)?;
    Ok(())
  }
}

pub enum DrawWrapper {
  Draw(Box<Draw>),
  Record(Record),
}

impl DrawWrapper {
  pub fn save_result(
    &self,
    path: &Path,
    frame: &RgbImage,
    poses: &[Pose],
  ) -> Result<(), DirectoryRecordOutputError> {
    match self {
      DrawWrapper::Draw(draw) => {
        draw.draw_poses(frame, poses).save(path)?;
      }
      DrawWrapper::Record(record) => {
        frame.save(path)?;
        record.record(poses, path)?;
      }
    };

    Ok(())
  }
}

/// 按日期分目录保存每一帧：`<dir>/YYYY/MM/DD/HH-MM-SS-XXXX.png`
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  draw: DrawWrapper,
  frame_counter: AtomicU16,
  always: bool,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  /// `folder:///records?record&always`，`record` 时保存原图与 JSON，
  /// 否则保存绘制后的图像；`always` 时没有姿态的帧也保存
  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let draw = if uri.query_pairs().any(|(k, _)| k == "record") {
      DrawWrapper::Record(Record)
    } else {
      DrawWrapper::Draw(Box::new(Draw::from_query(uri)?))
    };
    let always = uri.query_pairs().any(|(k, _)| k == "always");

    Ok(DirectoryRecordOutput::new(uri.path(), draw, always))
  }
}

impl DirectoryRecordOutput {
  pub fn new(directory: impl Into<PathBuf>, draw: DrawWrapper, always: bool) -> Self {
    Self {
      directory: directory.into(),
      draw,
      frame_counter: AtomicU16::new(0),
      always,
    }
  }

  fn frame_id(&self) -> u16 {
    self.frame_counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1)
  }

  fn frame_path(&self, now: DateTime<Utc>) -> Result<PathBuf, DirectoryRecordOutputError> {
    let directory = self
      .directory
      .join(now.year().to_string())
      .join(format!("{:02}", now.month()))
      .join(format!("{:02}", now.day()));
    std::fs::create_dir_all(&directory)?;

    Ok(directory.join(format!(
      "{}-{:04X}.png",
      now.format("%H-%M-%S"),
      self.frame_id()
    )))
  }
}

impl Render<RgbImage, Vec<Pose>> for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, frame: &RgbImage, result: &Vec<Pose>) -> Result<(), Self::Error> {
    if !self.always && result.is_empty() {
      debug!("没有检测到姿态, 跳过保存");
      return Ok(());
    }

    let path = self.frame_path(Utc::now())?;
    debug!("保存帧到 {}", path.display());
    self.draw.save_result(&path, frame, result)
  }
}
