// 该文件是 Shanan （山南西风） 项目的一部分。
// src/bin/benchmark_predict.rs - 主干网络推理耗时测试
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

use std::convert::Infallible;

use anyhow::Result;
use clap::Parser;
use image::RgbImage;
use tracing::{debug, info};
use url::Url;

use shanan_posenet::{
  FromUrl,
  input::InputWrapper,
  model::{ModelOutputs, PoseNetBuilder},
  output::Render,
  runtime::RknnRuntime,
  task::{RepeatShotTask, Task},
};

/// PoseNet 主干网络推理耗时测试
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型配置，例如 mobilenet-v1:///models?stride=16&multiplier=0.75
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 重复次数
  #[arg(long, default_value = "100", value_name = "TIMES")]
  pub times: usize,
}

/// 只记录输出张量形状
struct ShapeLog;

impl Render<RgbImage, ModelOutputs> for ShapeLog {
  type Error = Infallible;

  fn render_result(&self, _frame: &RgbImage, result: &ModelOutputs) -> Result<(), Self::Error> {
    debug!(
      "热力图 {:?}, 偏移 {:?}, 前向位移 {:?}, 后向位移 {:?}",
      result.heatmap_scores.shape(),
      result.offsets.shape(),
      result.displacement_fwd.shape(),
      result.displacement_bwd.shape()
    );
    Ok(())
  }
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型配置: {}", args.model);
  info!("输入来源: {}", args.input);

  let builder = PoseNetBuilder::from_url(&args.model)?;
  let model = builder.load_base_model(&RknnRuntime, &builder.directory_store())?;
  let input = InputWrapper::from_url(&args.input)?;

  RepeatShotTask::default()
    .with_times(args.times)
    .run_task(input, model, ShapeLog)?;

  Ok(())
}
