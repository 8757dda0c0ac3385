// 该文件是 Holedet （孔洞检测） 项目的一部分。
// src/label.rs - 标签表
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

use std::path::Path;

use thiserror::Error;
use tracing::{debug, error, warn};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

/// 无法解析的类别所使用的标签
pub const UNKNOWN_LABEL: &str = "?";

#[derive(Error, Debug)]
pub enum LabelError {
  #[error("URI 方案不匹配: 期望 '{expected}', 实际 '{found}'")]
  SchemeMismatch {
    expected: &'static str,
    found: String,
  },
}

/// 类别编号到标签下标的映射方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LabelIndexing {
  /// 类别编号即标签下标
  #[default]
  Direct,
  /// 下标 0 为背景，类别编号加一后查表
  BackgroundOffset,
}

impl LabelIndexing {
  pub fn from_offset(offset: u8) -> Option<Self> {
    match offset {
      0 => Some(LabelIndexing::Direct),
      1 => Some(LabelIndexing::BackgroundOffset),
      _ => None,
    }
  }

  pub fn offset(self) -> i64 {
    match self {
      LabelIndexing::Direct => 0,
      LabelIndexing::BackgroundOffset => 1,
    }
  }
}

/// 只读标签表，构造后不可修改，可在多个解码调用之间共享
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelTable {
  labels: Box<[String]>,
}

impl LabelTable {
  /// 按 `\r`、`\n` 切分文本，去掉空行，每行去除首尾空白
  pub fn from_text(text: Option<&str>) -> Self {
    let Some(text) = text else {
      warn!("标签文本为空，所有类别将解析为 '{}'", UNKNOWN_LABEL);
      return Self::default();
    };

    let labels: Box<[String]> = text
      .split(['\r', '\n'])
      .filter(|line| !line.is_empty())
      .map(|line| line.trim().to_string())
      .collect();

    debug!("加载标签 {} 个", labels.len());
    Self { labels }
  }

  /// 读取标签文件；文件缺失或无法读取时退化为空表
  pub fn load(path: impl AsRef<Path>) -> Self {
    let path = path.as_ref();
    match std::fs::read_to_string(path) {
      Ok(text) => Self::from_text(Some(&text)),
      Err(e) => {
        error!("无法读取标签文件 {}: {}", path.display(), e);
        Self::default()
      }
    }
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.labels.iter().map(String::as_str)
  }

  /// 任意整数均可查询，越界返回 `"?"`
  pub fn resolve(&self, id: i64) -> &str {
    if id < 0 {
      return UNKNOWN_LABEL;
    }
    usize::try_from(id)
      .ok()
      .and_then(|idx| self.labels.get(idx))
      .map(String::as_str)
      .unwrap_or(UNKNOWN_LABEL)
  }

  pub fn resolve_with(&self, class_index: i32, indexing: LabelIndexing) -> &str {
    if class_index < 0 {
      return UNKNOWN_LABEL;
    }
    self.resolve(i64::from(class_index) + indexing.offset())
  }
}

impl FromUrlWithScheme for LabelTable {
  const SCHEME: &'static str = "labels";
}

impl FromUrl for LabelTable {
  type Error = LabelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(LabelError::SchemeMismatch {
        expected: Self::SCHEME,
        found: url.scheme().to_string(),
      });
    }

    Ok(Self::load(crate::url_file_path(url)))
  }
}
