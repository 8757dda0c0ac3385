// 该文件是 Holedet （孔洞检测） 项目的一部分。
// src/model/filter.rs - 检测结果过滤
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

use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

use crate::model::DetectionRecord;

pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.5;

#[derive(Error, Debug, PartialEq)]
pub enum FilterError {
  #[error("置信度阈值必须在 [0, 1] 范围内, 实际为 {0}")]
  ThresholdOutOfRange(f32),
  #[error("无法解析置信度阈值: {0}")]
  Parse(String),
}

/// 置信度阈值，取值范围 `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct ScoreThreshold(f32);

impl ScoreThreshold {
  pub fn new(value: f32) -> Result<Self, FilterError> {
    if !(0.0..=1.0).contains(&value) {
      return Err(FilterError::ThresholdOutOfRange(value));
    }
    Ok(Self(value))
  }

  pub fn value(self) -> f32 {
    self.0
  }

  pub fn accepts(self, score: f32) -> bool {
    score >= self.0
  }
}

impl Default for ScoreThreshold {
  fn default() -> Self {
    Self(DEFAULT_SCORE_THRESHOLD)
  }
}

impl FromStr for ScoreThreshold {
  type Err = FilterError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let value: f32 = s
      .trim()
      .parse()
      .map_err(|e: std::num::ParseFloatError| FilterError::Parse(e.to_string()))?;
    Self::new(value)
  }
}

/// 保留 `score >= threshold` 的检测，顺序不变
pub fn filter_by_score<I>(records: I, threshold: ScoreThreshold) -> Vec<DetectionRecord>
where
  I: IntoIterator<Item = DetectionRecord>,
{
  let kept: Vec<_> = records
    .into_iter()
    .filter(|record| threshold.accepts(record.score))
    .collect();
  debug!("阈值 {:.2} 过滤后剩余 {} 个检测", threshold.value(), kept.len());
  kept
}

/// 只保留指定标签的检测
pub fn retain_label(records: &mut Vec<DetectionRecord>, label: &str) {
  records.retain(|record| record.label == label);
}
