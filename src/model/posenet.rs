// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/posenet.rs - PoseNet 加载与推理
//
// 本程序遵循 GNU Affero 通用公共许可证（AGPL）许可协议。
// 本程序的发布旨在提供实用价值，但不作任何形式的担保，
// 包括但不限于对适销性或特定用途适用性的默示担保。
// 更多详情请参阅 GNU 通用公共许可证。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, ETVP

use std::path::PathBuf;

use image::RgbImage;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl,
  frame::pad_and_resize,
  model::{
    BaseModel, CheckpointStore, DirectoryStore, InferenceConfig, Model, ModelConfig, PoseDecoder,
    PoseNetError, ResolvedCheckpoint, SINGLE_PERSON_INFERENCE_CONFIG, decode_poses,
    scale_and_flip_poses,
  },
  pose::Pose,
  runtime::{Runtime, Session},
};

pub struct PoseNetBuilder {
  config: ModelConfig,
  inference: InferenceConfig,
  model_dir: PathBuf,
}

impl FromUrl for PoseNetBuilder {
  type Error = PoseNetError;

  /// `mobilenet-v1:///models?stride=16&multiplier=0.75`，
  /// 路径部分为存放权重文件的目录
  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    let config = ModelConfig::from_url(url)?;
    let mut builder = PoseNetBuilder::new(config);
    if !url.path().is_empty() {
      builder.model_dir = PathBuf::from(url.path());
    }
    Ok(builder)
  }
}

impl PoseNetBuilder {
  pub fn new(config: ModelConfig) -> Self {
    Self {
      config,
      inference: SINGLE_PERSON_INFERENCE_CONFIG,
      model_dir: PathBuf::from("."),
    }
  }

  pub fn config(&self) -> &ModelConfig {
    &self.config
  }

  /// `Model::infer` 使用的推理配置
  pub fn inference(mut self, inference: InferenceConfig) -> Self {
    self.inference = inference;
    self
  }

  pub fn model_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.model_dir = dir.into();
    self
  }

  /// 从 URL 给出的目录读取权重
  pub fn directory_store(&self) -> DirectoryStore {
    DirectoryStore::new(&self.model_dir)
  }

  /// 校验配置并确定要加载的权重
  pub fn resolve(&self) -> Result<ResolvedCheckpoint, PoseNetError> {
    let checkpoint = self.config.validate()?;
    Ok(ResolvedCheckpoint {
      checkpoint,
      output_stride: self.config.output_stride,
      quant_bytes: self.config.quant_bytes,
    })
  }

  /// 只加载主干网络，不涉及解码
  pub fn load_base_model<R, C>(
    &self,
    runtime: &R,
    store: &C,
  ) -> Result<BaseModel<R::Session>, PoseNetError>
  where
    R: Runtime,
    C: CheckpointStore + ?Sized,
  {
    let resolved = self.resolve()?;
    info!(
      "加载 {} 权重 {}, 输出步长 {}, 输入分辨率 {}x{}",
      self.config.architecture,
      resolved.checkpoint.name,
      self.config.output_stride,
      self.config.input_resolution.width,
      self.config.input_resolution.height
    );

    let data = store.fetch(&resolved)?;
    let session = runtime
      .load(&data)
      .map_err(|e| PoseNetError::Runtime(Box::new(e)))?;
    info!("模型加载完成");

    BaseModel::new(&self.config, session)
  }

  pub fn build<R, C, D>(
    self,
    runtime: &R,
    store: &C,
    decoder: D,
  ) -> Result<PoseNet<R::Session, D>, PoseNetError>
  where
    R: Runtime,
    C: CheckpointStore + ?Sized,
    D: PoseDecoder,
  {
    self.inference.validate()?;
    let base = self.load_base_model(runtime, store)?;
    Ok(PoseNet {
      base,
      decoder,
      inference: self.inference,
    })
  }
}

/// 主干网络加外部解码器
pub struct PoseNet<S, D> {
  base: BaseModel<S>,
  decoder: D,
  inference: InferenceConfig,
}

impl<S: Session, D: PoseDecoder> PoseNet<S, D> {
  pub fn new(base: BaseModel<S>, decoder: D) -> Self {
    Self {
      base,
      decoder,
      inference: SINGLE_PERSON_INFERENCE_CONFIG,
    }
  }

  pub fn base_model(&self) -> &BaseModel<S> {
    &self.base
  }

  pub fn inference_config(&self) -> &InferenceConfig {
    &self.inference
  }

  /// 估计图像中的姿态，坐标位于原图像素空间
  pub fn estimate_poses(
    &self,
    image: &RgbImage,
    config: &InferenceConfig,
  ) -> Result<Vec<Pose>, PoseNetError> {
    config.validate()?;
    if self.base.is_disposed() {
      return Err(PoseNetError::ModelDisposed);
    }

    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
      return Err(PoseNetError::EmptyImage);
    }

    let resolution = self.base.input_resolution();
    let frame = pad_and_resize(image, resolution);
    let outputs = self.base.predict(&frame.image)?;
    let poses = decode_poses(
      &self.decoder,
      &outputs,
      self.base.output_stride(),
      config,
    );
    drop(outputs);

    debug!("解码得到 {} 个姿态", poses.len());
    Ok(scale_and_flip_poses(
      poses,
      (height, width),
      resolution,
      frame.padding,
      config.flip_horizontal(),
    ))
  }

  pub fn dispose(&mut self) {
    self.base.dispose();
  }

  pub fn is_disposed(&self) -> bool {
    self.base.is_disposed()
  }
}

impl<S: Session, D: PoseDecoder> Model for PoseNet<S, D> {
  type Input = RgbImage;
  type Output = Vec<Pose>;
  type Error = PoseNetError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    self.estimate_poses(input, &self.inference)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    model::{MOBILENET_V1_CONFIG, MULTI_PERSON_INFERENCE_CONFIG, ModelOutputs},
    pose::{Keypoint, PartId, Position},
    runtime::tests::FixedSession,
  };

  /// 在输入空间中心放置一个鼻子关键点
  struct CentreDecoder;

  impl CentreDecoder {
    fn pose(outputs: &ModelOutputs, output_stride: u32) -> Pose {
      let (height, width) = outputs.grid_shape();
      let centre = |cells: usize| ((cells - 1) as u32 * output_stride) as f32 / 2.0;
      Pose {
        keypoints: vec![Keypoint {
          part: PartId::Nose,
          position: Position::new(centre(width), centre(height)),
          score: outputs.heatmap_scores.get(0, 0, 0),
        }],
        score: 0.9,
      }
    }
  }

  impl PoseDecoder for CentreDecoder {
    fn decode_single(&self, outputs: &ModelOutputs, output_stride: u32) -> Pose {
      Self::pose(outputs, output_stride)
    }

    fn decode_multiple(
      &self,
      outputs: &ModelOutputs,
      output_stride: u32,
      _max_detections: usize,
      _score_threshold: f32,
      _nms_radius: f32,
    ) -> Vec<Pose> {
      vec![Self::pose(outputs, output_stride); 8]
    }
  }

  fn posenet() -> PoseNet<FixedSession, CentreDecoder> {
    let base = BaseModel::new(&MOBILENET_V1_CONFIG, FixedSession::zeros(17, 17)).unwrap();
    PoseNet::new(base, CentreDecoder)
  }

  #[test]
  fn poses_are_returned_in_image_space() {
    let net = posenet();
    let image = RgbImage::new(640, 480);
    let poses = net
      .estimate_poses(&image, &SINGLE_PERSON_INFERENCE_CONFIG)
      .unwrap();

    assert_eq!(poses.len(), 1);
    let nose = poses[0].keypoint(PartId::Nose).unwrap();
    assert!((nose.position.x - 320.0).abs() < 2.0, "x = {}", nose.position.x);
    assert!((nose.position.y - 240.0).abs() < 2.0, "y = {}", nose.position.y);
    assert_eq!(nose.score, 0.5);
  }

  #[test]
  fn multi_person_results_are_capped() {
    let net = posenet();
    let image = RgbImage::new(320, 240);
    let poses = net
      .estimate_poses(&image, &MULTI_PERSON_INFERENCE_CONFIG)
      .unwrap();
    assert_eq!(poses.len(), 5);
  }

  #[test]
  fn rejects_empty_image_and_invalid_config() {
    let net = posenet();
    assert!(matches!(
      net.estimate_poses(&RgbImage::new(0, 10), &SINGLE_PERSON_INFERENCE_CONFIG),
      Err(PoseNetError::EmptyImage)
    ));

    let invalid = InferenceConfig::MultiPerson {
      max_detections: 0,
      score_threshold: 0.5,
      nms_radius: 20.0,
      flip_horizontal: false,
    };
    assert!(matches!(
      net.estimate_poses(&RgbImage::new(10, 10), &invalid),
      Err(PoseNetError::Config(_))
    ));
  }

  #[test]
  fn dispose_is_idempotent_and_blocks_inference() {
    let mut net = posenet();
    net.dispose();
    net.dispose();
    assert!(net.is_disposed());
    assert!(matches!(
      net.infer(&RgbImage::new(64, 64)),
      Err(PoseNetError::ModelDisposed)
    ));
  }

  #[test]
  fn builder_reads_model_dir_from_url() {
    let url = Url::parse("resnet50:///opt/posenet?stride=16").unwrap();
    let builder = PoseNetBuilder::from_url(&url).unwrap();
    assert_eq!(builder.config().output_stride, 16);

    let resolved = builder.resolve().unwrap();
    assert_eq!(
      builder.directory_store().path_of(&resolved),
      PathBuf::from("/opt/posenet/resnet50_100-float-stride16.rknn")
    );
  }
}
