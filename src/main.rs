// 该文件是 Holedet （孔洞检测） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use holedet::{
  FromUrl,
  detector::Detector,
  input::InputWrapper,
  label::LabelTable,
  model::{EfficientDetBuilder, ReplayInterpreter},
  output::OutputWrapper,
  task::{ContinuousTask, Task},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("模型配置: {}", args.model);
  info!("录制张量: {}", args.tensors.display());
  info!("标签文件: {}", args.labels);
  info!("输入来源: {}", args.input);
  info!("输出路径: {}", args.output);
  info!("置信度阈值: {}", args.confidence.value());

  let labels = Arc::new(LabelTable::from_url(&args.labels)?);
  let interpreter = ReplayInterpreter::open(&args.tensors)?;
  let model = EfficientDetBuilder::from_url(&args.model)?.build(interpreter, labels)?;
  let (height, width) = (model.input_height(), model.input_width());

  let detector = Detector::new(model, args.confidence).with_target_label(args.target_label);
  let input = InputWrapper::from_url(&args.input)?;
  let output = OutputWrapper::from_url(&args.output)?;

  ContinuousTask::default()
    .with_frame_number(args.frame_number)
    .run_task(input.into_nhwc(height, width), detector, output)?;

  Ok(())
}
