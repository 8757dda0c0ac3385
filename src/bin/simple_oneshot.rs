// 该文件是 Holedet （孔洞检测） 项目的一部分。
// src/bin/simple_oneshot.rs - 单帧解码
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Holedet contributors

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::Parser;
use url::Url;

use holedet::{
  FromUrl,
  detector::Detector,
  input::BlankInput,
  label::LabelTable,
  model::{EfficientDetBuilder, ReplayInterpreter, filter::ScoreThreshold},
  output::OutputWrapper,
  task::{OneShotTask, Task},
};
use tracing::info;

/// 解码一次录制的推理输出
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型配置
  #[arg(long, value_name = "MODEL", default_value = "effdet:///model.tflite")]
  pub model: Url,
  /// 录制的推理输出（JSON）
  #[arg(long, value_name = "FILE")]
  pub tensors: PathBuf,
  /// 标签文件
  #[arg(long, value_name = "LABELS")]
  pub labels: Url,
  /// 输出路径
  #[arg(long, value_name = "OUTPUT", default_value = "log://")]
  pub output: Url,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型配置: {}", args.model);
  info!("录制张量: {}", args.tensors.display());
  info!("输出路径: {}", args.output);

  let labels = Arc::new(LabelTable::from_url(&args.labels)?);
  let interpreter = ReplayInterpreter::open(&args.tensors)?;
  let model = EfficientDetBuilder::from_url(&args.model)?.build(interpreter, labels)?;
  let (height, width) = (model.input_height(), model.input_width());
  let output = OutputWrapper::from_url(&args.output)?;

  OneShotTask.run_task(
    BlankInput::new(1).into_nhwc(height, width),
    Detector::new(model, ScoreThreshold::default()),
    output,
  )?;

  Ok(())
}
