// 该文件是 Holedet （孔洞检测） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::path::PathBuf;

use clap::Parser;
use holedet::model::filter::ScoreThreshold;
use url::Url;

/// Holedet 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 模型配置，例如 effdet:///models/hole.tflite?max_detections=25&layout=ymin_xmin_ymax_xmax
  #[arg(long, value_name = "MODEL")]
  pub model: Url,

  /// 录制的推理输出（JSON），作为推理引擎回放
  #[arg(long, value_name = "FILE")]
  pub tensors: PathBuf,

  /// 标签文件，例如 labels:///models/labels.txt
  #[arg(long, value_name = "LABELS")]
  pub labels: Url,

  /// 输入来源
  /// 支持格式:
  /// - 图片: image:///path/to/part.jpg
  /// - 空白帧: blank://?frames=3
  #[arg(long, value_name = "SOURCE", default_value = "blank://")]
  pub input: Url,

  /// 输出路径
  /// 支持格式:
  /// - JSON: json:///path/to/holes.json[?pretty]
  /// - 日志: log://
  #[arg(long, value_name = "OUTPUT", default_value = "log://")]
  pub output: Url,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.5", value_name = "THRESHOLD")]
  pub confidence: ScoreThreshold,

  /// 只保留该标签的检测结果，例如 hole
  #[arg(long, value_name = "LABEL")]
  pub target_label: Option<String>,

  /// 最大处理帧数（不指定表示处理全部输入）
  #[arg(long, value_name = "COUNT")]
  pub frame_number: Option<usize>,
}
