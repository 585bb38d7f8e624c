// 该文件是 Shanan （山南西风） 项目的一部分。
// src/task.rs - 推理任务
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

use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::{model::Model, output::Render};

/// 预热轮数，不计入平均耗时
const WARMUP_TIMES: usize = 2;
const REPEAT_TIMES: usize = 100;

pub trait Task<I, M, O>: Sized {
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<(), Self::Error>;
}

pub struct OneShotTask;

impl<
  F,
  D,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始推理...");
    let now = Instant::now();
    let result = model.infer(&frame)?;
    info!("推理完成，耗时: {:.2?}", now.elapsed());
    output.render_result(&frame, &result)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    Ok(())
  }
}

/// 对同一帧重复推理并统计平均耗时
#[derive(Debug)]
pub struct RepeatShotTask {
  times: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self {
      times: REPEAT_TIMES,
    }
  }
}

impl RepeatShotTask {
  pub fn with_times(mut self, times: usize) -> Self {
    self.times = times.max(1);
    self
  }
}

/// 去掉预热轮后的平均值，样本不足时使用全部样本
fn average(times: &[Duration]) -> Duration {
  let samples = if times.len() > WARMUP_TIMES {
    &times[WARMUP_TIMES..]
  } else {
    times
  };
  if samples.is_empty() {
    return Duration::ZERO;
  }
  samples.iter().sum::<Duration>() / samples.len() as u32
}

impl<
  F,
  D,
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = F>,
  M: Model<Input = F, Output = D, Error = ME>,
  O: Render<F, D, Error = RE>,
> Task<I, M, O> for RepeatShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<(), Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始推理...");
    let mut times = Vec::with_capacity(self.times);
    for i in 0..self.times {
      let now = Instant::now();
      let result = model.infer(&frame)?;
      let elapsed = now.elapsed();
      info!("({})推理完成，耗时: {:.2?}", i, elapsed);
      output.render_result(&frame, &result)?;
      info!("({})渲染完成，耗时: {:.2?}", i, now.elapsed());
      times.push(elapsed);
    }

    warn!("平均推理时间: {:.2?}", average(&times));

    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use std::cell::Cell;

  use thiserror::Error;

  use super::*;

  #[derive(Error, Debug)]
  #[error("失败")]
  struct Failed;

  struct Doubler<'a> {
    calls: &'a Cell<usize>,
    fail: bool,
  }

  impl Model for Doubler<'_> {
    type Input = u32;
    type Output = u32;
    type Error = Failed;

    fn infer(&self, input: &u32) -> Result<u32, Failed> {
      self.calls.set(self.calls.get() + 1);
      if self.fail { Err(Failed) } else { Ok(input * 2) }
    }
  }

  struct Collect<'a> {
    seen: &'a Cell<Option<(u32, u32)>>,
    count: &'a Cell<usize>,
  }

  impl Render<u32, u32> for Collect<'_> {
    type Error = Failed;

    fn render_result(&self, frame: &u32, result: &u32) -> Result<(), Failed> {
      self.seen.set(Some((*frame, *result)));
      self.count.set(self.count.get() + 1);
      Ok(())
    }
  }

  #[test]
  fn one_shot_renders_first_frame() {
    let (calls, seen, count) = (Cell::new(0), Cell::new(None), Cell::new(0));
    let model = Doubler {
      calls: &calls,
      fail: false,
    };
    let output = Collect {
      seen: &seen,
      count: &count,
    };

    OneShotTask
      .run_task([21, 5].into_iter(), model, output)
      .unwrap();
    assert_eq!(calls.get(), 1);
    assert_eq!(seen.get(), Some((21, 42)));
  }

  #[test]
  fn repeat_shot_runs_requested_times() {
    let (calls, seen, count) = (Cell::new(0), Cell::new(None), Cell::new(0));
    let model = Doubler {
      calls: &calls,
      fail: false,
    };
    let output = Collect {
      seen: &seen,
      count: &count,
    };

    RepeatShotTask::default()
      .with_times(7)
      .run_task(std::iter::once(3), model, output)
      .unwrap();
    assert_eq!(calls.get(), 7);
    assert_eq!(count.get(), 7);
  }

  #[test]
  fn empty_input_and_model_errors_propagate() {
    let (calls, seen, count) = (Cell::new(0), Cell::new(None), Cell::new(0));
    let output = || Collect {
      seen: &seen,
      count: &count,
    };

    let model = Doubler {
      calls: &calls,
      fail: false,
    };
    assert!(
      OneShotTask
        .run_task(std::iter::empty(), model, output())
        .is_err()
    );

    let model = Doubler {
      calls: &calls,
      fail: true,
    };
    assert!(
      RepeatShotTask::default()
        .run_task(std::iter::once(1), model, output())
        .is_err()
    );
    assert_eq!(count.get(), 0);
  }

  #[test]
  fn average_skips_warmup() {
    let ms = Duration::from_millis;
    assert_eq!(average(&[ms(100), ms(50), ms(10), ms(20)]), ms(15));
    assert_eq!(average(&[ms(8), ms(4)]), ms(6));
    assert_eq!(average(&[]), Duration::ZERO);
  }
}
