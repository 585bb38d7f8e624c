// 该文件是 Shanan （山南西风） 项目的一部分。
// tests/posenet.rs - PoseNet 加载与推理流程测试
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

use std::cell::{Cell, RefCell};

use image::RgbImage;
use thiserror::Error;
use url::Url;

use shanan_posenet::{
  FromUrl,
  frame::{InputTensor, Padding},
  model::{
    Architecture, CheckpointStore, ConfigError, InferenceConfig, InputResolution,
    MOBILENET_V1_CONFIG, MULTI_PERSON_INFERENCE_CONFIG, Model, ModelConfig, ModelOutputs,
    PoseDecoder, PoseNetBuilder, PoseNetError, QuantBytes, RESNET50_CONFIG, ResolvedCheckpoint,
    SINGLE_PERSON_INFERENCE_CONFIG, scale_and_flip_poses,
  },
  pose::{Keypoint, NUM_KEYPOINTS, PartId, Pose, Position},
  runtime::{Runtime, Session},
};

#[derive(Error, Debug)]
#[error("模拟运行时错误")]
struct FakeError;

/// 按输入尺寸生成全零 logits
struct ZeroSession {
  output_stride: usize,
  inputs: RefCell<Vec<(usize, usize, usize)>>,
}

impl Session for ZeroSession {
  type Error = FakeError;

  fn run(&self, input: &InputTensor) -> Result<Vec<Box<[f32]>>, Self::Error> {
    self
      .inputs
      .borrow_mut()
      .push((input.height(), input.width(), input.channels()));
    let height = (input.height() - 1) / self.output_stride + 1;
    let width = (input.width() - 1) / self.output_stride + 1;
    Ok(
      [17, 34, 32, 32]
        .into_iter()
        .map(|c| vec![0.0; c * height * width].into_boxed_slice())
        .collect(),
    )
  }
}

struct FakeRuntime {
  output_stride: usize,
  fail: bool,
  loaded: RefCell<Vec<Vec<u8>>>,
}

impl FakeRuntime {
  fn new(output_stride: u32) -> Self {
    Self {
      output_stride: output_stride as usize,
      fail: false,
      loaded: RefCell::new(Vec::new()),
    }
  }
}

impl Runtime for FakeRuntime {
  type Session = ZeroSession;
  type Error = FakeError;

  fn load(&self, model_data: &[u8]) -> Result<Self::Session, Self::Error> {
    if self.fail {
      return Err(FakeError);
    }
    self.loaded.borrow_mut().push(model_data.to_vec());
    Ok(ZeroSession {
      output_stride: self.output_stride,
      inputs: RefCell::new(Vec::new()),
    })
  }
}

#[derive(Default)]
struct MemoryStore {
  fetched: RefCell<Vec<String>>,
}

impl CheckpointStore for MemoryStore {
  fn fetch(&self, checkpoint: &ResolvedCheckpoint) -> Result<Vec<u8>, PoseNetError> {
    self.fetched.borrow_mut().push(checkpoint.file_name());
    Ok(checkpoint.file_name().into_bytes())
  }
}

/// 返回预设得分的姿态，关键点位于输入空间中心
struct ScriptedDecoder {
  scores: Vec<f32>,
  multiple_calls: Cell<usize>,
}

impl ScriptedDecoder {
  fn new(scores: &[f32]) -> Self {
    Self {
      scores: scores.to_vec(),
      multiple_calls: Cell::new(0),
    }
  }

  fn pose(outputs: &ModelOutputs, output_stride: u32, score: f32) -> Pose {
    let (height, width) = outputs.grid_shape();
    let x = ((width - 1) as u32 * output_stride) as f32 / 2.0;
    let y = ((height - 1) as u32 * output_stride) as f32 / 2.0;
    Pose {
      keypoints: PartId::ALL
        .iter()
        .map(|&part| Keypoint {
          part,
          position: Position::new(x, y),
          score,
        })
        .collect(),
      score,
    }
  }
}

impl PoseDecoder for ScriptedDecoder {
  fn decode_single(&self, outputs: &ModelOutputs, output_stride: u32) -> Pose {
    Self::pose(outputs, output_stride, self.scores[0])
  }

  fn decode_multiple(
    &self,
    outputs: &ModelOutputs,
    output_stride: u32,
    _max_detections: usize,
    _score_threshold: f32,
    _nms_radius: f32,
  ) -> Vec<Pose> {
    self.multiple_calls.set(self.multiple_calls.get() + 1);
    self
      .scores
      .iter()
      .map(|&score| Self::pose(outputs, output_stride, score))
      .collect()
  }
}

#[test]
fn builder_loads_and_estimates_in_image_space() {
  let runtime = FakeRuntime::new(16);
  let store = MemoryStore::default();
  let net = PoseNetBuilder::new(MOBILENET_V1_CONFIG)
    .build(&runtime, &store, ScriptedDecoder::new(&[0.8]))
    .unwrap();

  assert_eq!(
    store.fetched.borrow().as_slice(),
    ["mobilenet_v1_075-float-stride16.rknn"]
  );
  assert_eq!(runtime.loaded.borrow().len(), 1);
  assert_eq!(net.base_model().architecture(), Architecture::MobileNetV1);

  let poses = net
    .estimate_poses(&RgbImage::new(640, 480), &SINGLE_PERSON_INFERENCE_CONFIG)
    .unwrap();
  assert_eq!(poses.len(), 1);
  assert_eq!(poses[0].keypoints.len(), NUM_KEYPOINTS);
  for keypoint in &poses[0].keypoints {
    assert!((keypoint.position.x - 320.0).abs() < 2.0);
    assert!((keypoint.position.y - 240.0).abs() < 2.0);
  }
}

#[test]
fn resnet_receives_full_resolution_input() {
  let config = ModelConfig {
    input_resolution: InputResolution {
      width: 321,
      height: 225,
    },
    ..RESNET50_CONFIG
  };
  let runtime = FakeRuntime::new(32);
  let net = PoseNetBuilder::new(config)
    .build(&runtime, &MemoryStore::default(), ScriptedDecoder::new(&[0.6]))
    .unwrap();

  let poses = net
    .estimate_poses(&RgbImage::new(100, 100), &SINGLE_PERSON_INFERENCE_CONFIG)
    .unwrap();
  assert_eq!(poses.len(), 1);
  assert_eq!(net.base_model().input_resolution(), config.input_resolution);
}

#[test]
fn invalid_model_config_fails_before_fetch() {
  let config = ModelConfig {
    output_stride: 32,
    ..MOBILENET_V1_CONFIG
  };
  let runtime = FakeRuntime::new(32);
  let store = MemoryStore::default();

  let result = PoseNetBuilder::new(config).build(&runtime, &store, ScriptedDecoder::new(&[0.5]));
  assert!(matches!(
    result,
    Err(PoseNetError::Config(ConfigError::UnsupportedOutputStride { stride: 32, .. }))
  ));
  assert!(store.fetched.borrow().is_empty());
  assert!(runtime.loaded.borrow().is_empty());
}

#[test]
fn invalid_inference_config_fails_before_fetch() {
  let store = MemoryStore::default();
  let result = PoseNetBuilder::new(MOBILENET_V1_CONFIG)
    .inference(InferenceConfig::MultiPerson {
      max_detections: 5,
      score_threshold: 0.5,
      nms_radius: -1.0,
      flip_horizontal: false,
    })
    .build(&FakeRuntime::new(16), &store, ScriptedDecoder::new(&[0.5]));

  assert!(matches!(
    result,
    Err(PoseNetError::Config(ConfigError::InvalidNmsRadius(_)))
  ));
  assert!(store.fetched.borrow().is_empty());
}

#[test]
fn runtime_failure_is_reported() {
  let runtime = FakeRuntime {
    fail: true,
    ..FakeRuntime::new(16)
  };
  let result = PoseNetBuilder::new(MOBILENET_V1_CONFIG).build(
    &runtime,
    &MemoryStore::default(),
    ScriptedDecoder::new(&[0.5]),
  );
  assert!(matches!(result, Err(PoseNetError::Runtime(_))));
}

#[test]
fn multi_person_respects_cap_and_threshold() {
  let scores = [0.05, 0.92, 0.4, 0.61, 0.77, 0.5, 0.33, 0.88, 0.99, 0.7, 0.15];
  let net = PoseNetBuilder::new(MOBILENET_V1_CONFIG)
    .build(
      &FakeRuntime::new(16),
      &MemoryStore::default(),
      ScriptedDecoder::new(&scores),
    )
    .unwrap();
  let image = RgbImage::new(200, 120);

  for max_detections in [1, 3, 5, 20] {
    for score_threshold in [0.0, 0.5, 0.9, 1.0] {
      let config = InferenceConfig::MultiPerson {
        max_detections,
        score_threshold,
        nms_radius: 20.0,
        flip_horizontal: false,
      };
      let poses = net.estimate_poses(&image, &config).unwrap();

      let passing = scores.iter().filter(|&&s| s >= score_threshold).count();
      assert_eq!(poses.len(), passing.min(max_detections));
      assert!(poses.iter().all(|p| p.score >= score_threshold));
      assert!(poses.windows(2).all(|w| w[0].score >= w[1].score));
    }
  }

  let poses = net
    .estimate_poses(&image, &MULTI_PERSON_INFERENCE_CONFIG)
    .unwrap();
  assert_eq!(poses.len(), 5);
}

/// 在输入空间固定位置放置全部关键点
struct FixedPointDecoder(Position);

impl FixedPointDecoder {
  fn pose(&self) -> Pose {
    Pose {
      keypoints: PartId::ALL
        .iter()
        .map(|&part| Keypoint {
          part,
          position: self.0,
          score: 0.9,
        })
        .collect(),
      score: 0.9,
    }
  }
}

impl PoseDecoder for FixedPointDecoder {
  fn decode_single(&self, _outputs: &ModelOutputs, _output_stride: u32) -> Pose {
    self.pose()
  }

  fn decode_multiple(
    &self,
    _outputs: &ModelOutputs,
    _output_stride: u32,
    _max_detections: usize,
    _score_threshold: f32,
    _nms_radius: f32,
  ) -> Vec<Pose> {
    vec![self.pose(), self.pose()]
  }
}

#[test]
fn flip_mirrors_off_centre_keypoints_in_image_space() {
  let net = PoseNetBuilder::new(MOBILENET_V1_CONFIG)
    .build(
      &FakeRuntime::new(16),
      &MemoryStore::default(),
      FixedPointDecoder(Position::new(40.0, 100.0)),
    )
    .unwrap();
  let image = RgbImage::new(640, 480);

  for config in [SINGLE_PERSON_INFERENCE_CONFIG, MULTI_PERSON_INFERENCE_CONFIG] {
    let plain = net.estimate_poses(&image, &config).unwrap();
    let flipped = net
      .estimate_poses(&image, &config.with_flip_horizontal(true))
      .unwrap();
    assert_eq!(plain.len(), flipped.len());

    for (a, b) in plain.iter().zip(&flipped) {
      for (ka, kb) in a.keypoints.iter().zip(&b.keypoints) {
        // 40 * 640 / 257 ≈ 99.6
        assert!((ka.position.x - 99.6).abs() < 0.1, "x = {}", ka.position.x);
        assert!((kb.position.x - (639.0 - ka.position.x)).abs() < 1e-3);
        assert_eq!(kb.position.y, ka.position.y);
      }
    }
  }
}

#[test]
fn infer_uses_builder_inference_config() {
  let decoder = || FixedPointDecoder(Position::new(40.0, 100.0));
  let image = RgbImage::new(640, 480);

  let plain = PoseNetBuilder::new(MOBILENET_V1_CONFIG)
    .inference(MULTI_PERSON_INFERENCE_CONFIG)
    .build(&FakeRuntime::new(16), &MemoryStore::default(), decoder())
    .unwrap()
    .infer(&image)
    .unwrap();
  let flipped = PoseNetBuilder::new(MOBILENET_V1_CONFIG)
    .inference(MULTI_PERSON_INFERENCE_CONFIG.with_flip_horizontal(true))
    .build(&FakeRuntime::new(16), &MemoryStore::default(), decoder())
    .unwrap()
    .infer(&image)
    .unwrap();

  assert_eq!(plain.len(), 2);
  assert_eq!(flipped.len(), 2);
  let x = plain[0].keypoints[0].position.x;
  let x_flipped = flipped[0].keypoints[0].position.x;
  assert!((x_flipped - (639.0 - x)).abs() < 1e-3, "{x} vs {x_flipped}");
}

#[test]
fn dispose_twice_then_predict_fails() {
  let mut net = PoseNetBuilder::new(MOBILENET_V1_CONFIG)
    .build(
      &FakeRuntime::new(16),
      &MemoryStore::default(),
      ScriptedDecoder::new(&[0.5]),
    )
    .unwrap();

  net.dispose();
  net.dispose();
  assert!(net.is_disposed());
  assert!(matches!(
    net.estimate_poses(&RgbImage::new(10, 10), &SINGLE_PERSON_INFERENCE_CONFIG),
    Err(PoseNetError::ModelDisposed)
  ));
}

#[test]
fn url_builder_reads_checkpoint_from_directory() {
  let dir = tempfile::tempdir().unwrap();
  std::fs::write(dir.path().join("resnet50_100-quant2-stride16.rknn"), b"weights").unwrap();

  let url = Url::from_directory_path(dir.path()).unwrap();
  let url = Url::parse(&format!("resnet50://{}?stride=16&quant=2", url.path())).unwrap();
  let builder = PoseNetBuilder::from_url(&url).unwrap();
  assert_eq!(builder.config().quant_bytes, QuantBytes::Two);

  let runtime = FakeRuntime::new(16);
  let base = builder
    .load_base_model(&runtime, &builder.directory_store())
    .unwrap();
  assert_eq!(runtime.loaded.borrow()[0], b"weights");
  assert_eq!(base.output_stride(), 16);

  let outputs = base.infer(&RgbImage::new(30, 40)).unwrap();
  assert_eq!(outputs.grid_shape(), (17, 17));
  assert_eq!(outputs.heatmap_scores.get(0, 0, 0), 0.5);
}

#[test]
fn missing_checkpoint_is_an_io_error() {
  let dir = tempfile::tempdir().unwrap();
  let builder = PoseNetBuilder::new(MOBILENET_V1_CONFIG).model_dir(dir.path());

  let result = builder.load_base_model(&FakeRuntime::new(16), &builder.directory_store());
  assert!(matches!(result, Err(PoseNetError::CheckpointIo { .. })));
}

#[test]
fn unknown_architecture_url_is_rejected() {
  let url = Url::parse("efficientnet:///models").unwrap();
  assert!(matches!(
    PoseNetBuilder::from_url(&url),
    Err(PoseNetError::Config(ConfigError::UnsupportedArchitecture(_)))
  ));
}

#[test]
fn rescale_worked_example() {
  let pose = Pose {
    keypoints: vec![Keypoint {
      part: PartId::Nose,
      position: Position::new(100.0, 100.0),
      score: 1.0,
    }],
    score: 1.0,
  };
  let padding = Padding {
    bottom: 52,
    ..Padding::default()
  };

  let poses = scale_and_flip_poses(
    vec![pose],
    (480, 640),
    InputResolution::square(257),
    padding,
    false,
  );
  let position = poses[0].keypoints[0].position;
  assert!((position.y - 207.0).abs() < 0.05);
  assert!((position.x - 249.0).abs() < 0.05);
}
