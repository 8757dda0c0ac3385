// 该文件是 Holedet （孔洞检测） 项目的一部分。
// src/detector.rs - 孔洞检测器
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

use tracing::info;

use crate::model::{
  DetectResult, Model,
  filter::{ScoreThreshold, filter_by_score, retain_label},
};

/// 在模型的定长输出之上做阈值过滤和标签筛选
pub struct Detector<M> {
  model: M,
  threshold: ScoreThreshold,
  target_label: Option<String>,
}

impl<M> Detector<M> {
  pub fn new(model: M, threshold: ScoreThreshold) -> Self {
    Self {
      model,
      threshold,
      target_label: None,
    }
  }

  /// 只保留该标签的检测，例如 `hole`
  pub fn with_target_label(mut self, label: Option<String>) -> Self {
    self.target_label = label;
    self
  }

  pub fn threshold(&self) -> ScoreThreshold {
    self.threshold
  }

  pub fn model(&self) -> &M {
    &self.model
  }
}

impl<M: Model<Output = DetectResult>> Model for Detector<M> {
  type Input = M::Input;
  type Output = DetectResult;
  type Error = M::Error;

  fn infer(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let raw = self.model.infer(input)?;
    let total = raw.len();

    let mut kept = filter_by_score(raw.items.into_vec(), self.threshold);
    if let Some(label) = &self.target_label {
      retain_label(&mut kept, label);
    }

    info!("检测到 {} 个目标（候选 {} 个）", kept.len(), total);
    Ok(DetectResult::from(kept))
  }
}
