// 该文件是 Holedet （孔洞检测） 项目的一部分。
// src/model/decoder.rs - 检测输出解码
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
use tracing::{debug, error};

use crate::{
  label::{LabelIndexing, LabelTable},
  model::{BoundingBox, DetectionRecord},
};

pub const DEFAULT_MAX_DETECTIONS: usize = 25;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
  #[error("输出缓冲区 {buffer} 长度不足: 期望至少 {expected}, 实际 {actual}")]
  InvalidArgument {
    buffer: &'static str,
    expected: usize,
    actual: usize,
  },
}

/// 位置张量中每个检测框四个数的排列方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoxLayout {
  /// `[ymin, xmin, ymax, xmax]`，图像坐标系（原点左上，y 向下）
  #[default]
  YminXminYmaxXmax,
  /// `[top, left, bottom, right]`，已是显示坐标系（原点左下，y 向上）
  TopLeftBottomRight,
}

impl FromStr for BoxLayout {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "ymin_xmin_ymax_xmax" | "yxyx" => Ok(BoxLayout::YminXminYmaxXmax),
      "top_left_bottom_right" | "tlbr" => Ok(BoxLayout::TopLeftBottomRight),
      other => Err(format!("未知的边界框布局: {}", other)),
    }
  }
}

/// 是否使用模型输出的有效检测数量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidCount {
  #[default]
  Ignore,
  Honor,
}

impl FromStr for ValidCount {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "ignore" => Ok(ValidCount::Ignore),
      "honor" => Ok(ValidCount::Honor),
      other => Err(format!("未知的有效数量策略: {}", other)),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
  pub max_detections: usize,
  pub layout: BoxLayout,
  pub label_indexing: LabelIndexing,
  pub valid_count: ValidCount,
}

impl Default for DecoderConfig {
  fn default() -> Self {
    Self {
      max_detections: DEFAULT_MAX_DETECTIONS,
      layout: BoxLayout::default(),
      label_indexing: LabelIndexing::default(),
      valid_count: ValidCount::default(),
    }
  }
}

/// 一次推理的四个原始输出，只读借用
#[derive(Debug, Clone, Copy)]
pub struct RawOutputTensors<'a> {
  pub locations: &'a [f32],
  pub classes: &'a [f32],
  pub scores: &'a [f32],
  pub num_detections: Option<&'a [f32]>,
}

#[derive(Debug, Clone, Default)]
pub struct DetectionDecoder {
  config: DecoderConfig,
}

fn require_len(buffer: &'static str, data: &[f32], expected: usize) -> Result<(), DecodeError> {
  if data.len() < expected {
    error!(
      "输出缓冲区 {} 长度不足: 期望至少 {}, 实际 {}",
      buffer,
      expected,
      data.len()
    );
    return Err(DecodeError::InvalidArgument {
      buffer,
      expected,
      actual: data.len(),
    });
  }
  Ok(())
}

impl DetectionDecoder {
  pub fn new(config: DecoderConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &DecoderConfig {
    &self.config
  }

  /// 按输入顺序解码，不排序、不做 NMS、不按分数过滤
  pub fn decode(
    &self,
    tensors: &RawOutputTensors<'_>,
    labels: &LabelTable,
  ) -> Result<Vec<DetectionRecord>, DecodeError> {
    let max = self.config.max_detections;
    // 上限过大时乘法溢出，任何缓冲区都不够长
    let locations_len = max.checked_mul(4).unwrap_or(usize::MAX);
    require_len("locations", tensors.locations, locations_len)?;
    require_len("classes", tensors.classes, max)?;
    require_len("scores", tensors.scores, max)?;

    let count = self.valid_count(tensors.num_detections)?;
    debug!("解码 {} 个检测结果（上限 {}）", count, max);

    let records = (0..count)
      .map(|i| {
        let offset = i * 4;
        let bbox = self.decode_box(&tensors.locations[offset..offset + 4]);
        let class_index = tensors.classes[i] as i32;
        DetectionRecord {
          class_index,
          label: labels
            .resolve_with(class_index, self.config.label_indexing)
            .to_string(),
          score: tensors.scores[i],
          bbox,
        }
      })
      .collect();

    Ok(records)
  }

  fn valid_count(&self, num_detections: Option<&[f32]>) -> Result<usize, DecodeError> {
    let max = self.config.max_detections;
    match (self.config.valid_count, num_detections) {
      (ValidCount::Honor, Some(buffer)) => {
        require_len("num_detections", buffer, 1)?;
        let count = buffer[0];
        // NaN 与负数都按 0 处理
        if count.is_nan() || count <= 0.0 {
          Ok(0)
        } else {
          Ok((count as usize).min(max))
        }
      }
      _ => Ok(max),
    }
  }

  fn decode_box(&self, raw: &[f32]) -> BoundingBox {
    let (top, left, bottom, right) = match self.config.layout {
      BoxLayout::YminXminYmaxXmax => (1.0 - raw[0], raw[1], 1.0 - raw[2], raw[3]),
      BoxLayout::TopLeftBottomRight => (raw[0], raw[1], raw[2], raw[3]),
    };

    BoundingBox {
      x: left,
      y: top,
      width: right - left,
      height: top - bottom,
    }
  }

  /// `decode_box` 的逆变换，按当前布局还原原始的四个数
  pub fn encode_box(&self, bbox: &BoundingBox) -> [f32; 4] {
    let top = bbox.y;
    let left = bbox.x;
    let bottom = bbox.y - bbox.height;
    let right = bbox.x + bbox.width;

    match self.config.layout {
      BoxLayout::YminXminYmaxXmax => [1.0 - top, left, 1.0 - bottom, right],
      BoxLayout::TopLeftBottomRight => [top, left, bottom, right],
    }
  }
}
