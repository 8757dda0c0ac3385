// 该文件是 Holedet （孔洞检测） 项目的一部分。
// src/model.rs - 模型
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

use serde::{Deserialize, Serialize};

pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 推理引擎接口，引擎本身视为黑盒
///
/// 每次 `invoke` 都会原地覆盖输出缓冲区，调用方需在下一次 `invoke`
/// 之前把结果拷贝出来。
pub trait Interpreter {
  type Error: std::error::Error + Send + Sync + 'static;

  /// 输入张量形状，NHWC 顺序
  fn input_shape(&self) -> &[usize];
  fn num_outputs(&self) -> usize;
  fn invoke(&mut self, input: &[u8]) -> Result<(), Self::Error>;
  fn output(&self, slot: usize) -> Result<&[f32], Self::Error>;
}

/// 归一化边界框，原点在左下角，y 轴向上
///
/// 坐标相对于模型输入画面。原始数据不一致时宽高可能为负，不做截断。
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
  pub x: f32,
  pub y: f32,
  pub width: f32,
  pub height: f32,
}

impl BoundingBox {
  pub fn has_positive_area(&self) -> bool {
    self.width > 0.0 && self.height > 0.0
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
  pub class_index: i32,
  pub label: String,
  pub score: f32,
  pub bbox: BoundingBox,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectResult {
  pub items: Box<[DetectionRecord]>,
}

impl DetectResult {
  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn iter(&self) -> impl Iterator<Item = &DetectionRecord> {
    self.items.iter()
  }
}

impl From<Vec<DetectionRecord>> for DetectResult {
  fn from(items: Vec<DetectionRecord>) -> Self {
    DetectResult {
      items: items.into_boxed_slice(),
    }
  }
}

pub mod decoder;
pub mod filter;

mod efficientdet;
pub use self::efficientdet::{
  EfficientDet, EfficientDetBuilder, EfficientDetError, InputShape, OutputSlots,
};

mod replay;
pub use self::replay::{RecordedFrame, ReplayError, ReplayInterpreter, TensorDump};
