// 该文件是 Holedet （孔洞检测） 项目的一部分。
// src/output/json_record.rs - JSON 检测记录输出
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

use std::{
  path::{Path, PathBuf},
  sync::atomic::{AtomicUsize, Ordering},
};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{DetectResult, DetectionRecord},
  output::Render,
};

#[derive(Error, Debug)]
pub enum JsonRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("输出路径为空")]
  EmptyPath,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("JSON 序列化错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 单帧检测记录文件内容
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
  pub frame: usize,
  pub exported_at: String,
  pub detections: Vec<DetectionRecord>,
}

/// 把每帧的检测结果写成 JSON 文件
///
/// 第一帧写入给定路径，之后的帧在文件名后追加帧序号，如 `out-0002.json`。
pub struct JsonRecordOutput {
  path: PathBuf,
  pretty: bool,
  frame_counter: AtomicUsize,
}

impl FromUrlWithScheme for JsonRecordOutput {
  const SCHEME: &'static str = "json";
}

impl FromUrl for JsonRecordOutput {
  type Error = JsonRecordOutputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(JsonRecordOutputError::SchemeMismatch);
    }

    let path = crate::url_file_path(url);
    if path.file_name().is_none() {
      return Err(JsonRecordOutputError::EmptyPath);
    }
    let pretty = url.query_pairs().any(|(k, _)| k == "pretty");

    Ok(JsonRecordOutput::new(path).pretty(pretty))
  }
}

impl JsonRecordOutput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      pretty: false,
      frame_counter: AtomicUsize::new(0),
    }
  }

  pub fn pretty(mut self, pretty: bool) -> Self {
    self.pretty = pretty;
    self
  }

  fn frame_id(&self) -> usize {
    self.frame_counter.fetch_add(1, Ordering::Relaxed) + 1
  }

  fn frame_path(&self, frame: usize) -> PathBuf {
    if frame == 1 {
      return self.path.clone();
    }

    let stem = self
      .path
      .file_stem()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_default();
    let name = match self.path.extension() {
      Some(ext) => format!("{}-{:04}.{}", stem, frame, ext.to_string_lossy()),
      None => format!("{}-{:04}", stem, frame),
    };
    self.path.with_file_name(name)
  }

  fn write(&self, path: &Path, record: &FrameRecord) -> Result<(), JsonRecordOutputError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
      std::fs::create_dir_all(dir)?;
    }
    let text = if self.pretty {
      serde_json::to_string_pretty(record)?
    } else {
      serde_json::to_string(record)?
    };
    std::fs::write(path, text)?;
    Ok(())
  }
}

impl<Frame> Render<Frame, DetectResult> for JsonRecordOutput {
  type Error = JsonRecordOutputError;

  fn render_result(&self, _frame: &Frame, result: &DetectResult) -> Result<(), Self::Error> {
    let frame = self.frame_id();
    let path = self.frame_path(frame);
    let record = FrameRecord {
      frame,
      exported_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
      detections: result.items.to_vec(),
    };
    self.write(&path, &record)?;
    info!("检测记录已保存: {} ({} 个)", path.display(), result.len());
    Ok(())
  }
}
