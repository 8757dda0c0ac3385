// 该文件是 Holedet （孔洞检测） 项目的一部分。
// src/model/efficientdet.rs - EfficientDet 模型定义
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

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use thiserror::Error;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::RgbNhwcFrame,
  label::{LabelIndexing, LabelTable},
  model::{
    DetectResult, Interpreter, Model,
    decoder::{BoxLayout, DecodeError, DecoderConfig, DetectionDecoder, RawOutputTensors, ValidCount},
  },
};

#[derive(Error, Debug)]
pub enum EfficientDetError {
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("配置参数 {key} 无效: {value}")]
  InvalidOption { key: String, value: String },
  #[error("输入形状无效: {0:?}")]
  InvalidInputShape(Vec<usize>),
  #[error("预期模型输出数量至少为 {expected}, 实际为 {actual}")]
  OutputCountMismatch { expected: usize, actual: usize },
  #[error("输入帧尺寸不匹配: 期望 {expected:?}, 实际 {actual:?}")]
  FrameShapeMismatch {
    expected: (usize, usize, usize),
    actual: (usize, usize, usize),
  },
  #[error("推理引擎错误: {0}")]
  Interpreter(Box<dyn std::error::Error + Send + Sync>),
  #[error("解码错误: {0}")]
  Decode(#[from] DecodeError),
}

impl EfficientDetError {
  fn interpreter<E: std::error::Error + Send + Sync + 'static>(e: E) -> Self {
    EfficientDetError::Interpreter(Box::new(e))
  }

  fn invalid(key: &str, value: &str) -> Self {
    EfficientDetError::InvalidOption {
      key: key.to_string(),
      value: value.to_string(),
    }
  }
}

/// 模型输入尺寸，加载时从 NHWC 形状读取
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputShape {
  pub height: usize,
  pub width: usize,
  pub channels: usize,
}

impl InputShape {
  pub fn from_nhwc(shape: &[usize]) -> Result<Self, EfficientDetError> {
    match *shape {
      [batch, height, width, channels]
        if batch > 0 && height > 0 && width > 0 && channels > 0 =>
      {
        Ok(Self {
          height,
          width,
          channels,
        })
      }
      _ => Err(EfficientDetError::InvalidInputShape(shape.to_vec())),
    }
  }

  pub fn as_tuple(&self) -> (usize, usize, usize) {
    (self.height, self.width, self.channels)
  }
}

/// 输出张量槽位到语义的映射，随模型导出方式变化
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputSlots {
  pub locations: usize,
  pub classes: usize,
  pub scores: usize,
  pub num_detections: Option<usize>,
}

impl Default for OutputSlots {
  fn default() -> Self {
    Self {
      scores: 0,
      locations: 1,
      num_detections: Some(2),
      classes: 3,
    }
  }
}

impl OutputSlots {
  /// 需要的最少输出数量
  pub fn required_outputs(&self) -> usize {
    [self.locations, self.classes, self.scores]
      .into_iter()
      .chain(self.num_detections)
      .max()
      .map_or(0, |slot| slot + 1)
  }
}

const EFFICIENTDET_SCHEME: &str = "effdet";

#[derive(Debug, Clone, Default)]
pub struct EfficientDetBuilder {
  model_path: PathBuf,
  config: DecoderConfig,
  slots: OutputSlots,
}

fn parse_option<T: std::str::FromStr>(
  pairs: &HashMap<String, String>,
  key: &str,
) -> Result<Option<T>, EfficientDetError> {
  pairs
    .get(key)
    .map(|value| {
      value
        .parse::<T>()
        .map_err(|_| EfficientDetError::invalid(key, value))
    })
    .transpose()
}

impl FromUrlWithScheme for EfficientDetBuilder {
  const SCHEME: &'static str = EFFICIENTDET_SCHEME;
}

impl FromUrl for EfficientDetBuilder {
  type Error = EfficientDetError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(EfficientDetError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let pairs: HashMap<String, String> = url.query_pairs().into_owned().collect();
    let mut builder = EfficientDetBuilder {
      model_path: crate::url_file_path(url),
      ..Default::default()
    };

    if let Some(max) = parse_option::<usize>(&pairs, "max_detections")? {
      builder = builder.max_detections(max);
    }
    if let Some(layout) = parse_option::<BoxLayout>(&pairs, "layout")? {
      builder = builder.layout(layout);
    }
    if let Some(offset) = parse_option::<u8>(&pairs, "label_offset")? {
      let indexing = LabelIndexing::from_offset(offset)
        .ok_or_else(|| EfficientDetError::invalid("label_offset", &offset.to_string()))?;
      builder = builder.label_indexing(indexing);
    }
    if let Some(valid_count) = parse_option::<ValidCount>(&pairs, "valid_count")? {
      builder = builder.valid_count(valid_count);
    }

    let mut slots = builder.slots;
    if let Some(slot) = parse_option(&pairs, "locations")? {
      slots.locations = slot;
    }
    if let Some(slot) = parse_option(&pairs, "classes")? {
      slots.classes = slot;
    }
    if let Some(slot) = parse_option(&pairs, "scores")? {
      slots.scores = slot;
    }
    if let Some(count) = pairs.get("count") {
      slots.num_detections = match count.as_str() {
        "none" => None,
        value => Some(
          value
            .parse()
            .map_err(|_| EfficientDetError::invalid("count", value))?,
        ),
      };
    }

    Ok(builder.slots(slots))
  }
}

impl EfficientDetBuilder {
  pub fn new(model_path: impl Into<PathBuf>) -> Self {
    Self {
      model_path: model_path.into(),
      ..Default::default()
    }
  }

  pub fn model_path(&self) -> &std::path::Path {
    &self.model_path
  }

  pub fn decoder_config(&self) -> &DecoderConfig {
    &self.config
  }

  pub fn output_slots(&self) -> &OutputSlots {
    &self.slots
  }

  pub fn max_detections(mut self, max_detections: usize) -> Self {
    self.config.max_detections = max_detections;
    self
  }

  pub fn layout(mut self, layout: BoxLayout) -> Self {
    self.config.layout = layout;
    self
  }

  pub fn label_indexing(mut self, indexing: LabelIndexing) -> Self {
    self.config.label_indexing = indexing;
    self
  }

  pub fn valid_count(mut self, valid_count: ValidCount) -> Self {
    self.config.valid_count = valid_count;
    self
  }

  pub fn slots(mut self, slots: OutputSlots) -> Self {
    self.slots = slots;
    self
  }

  pub fn build<I: Interpreter>(
    self,
    interpreter: I,
    labels: Arc<LabelTable>,
  ) -> Result<EfficientDet<I>, EfficientDetError> {
    info!("构建模型: {}", self.model_path.display());

    let input = InputShape::from_nhwc(interpreter.input_shape()).inspect_err(|e| {
      error!("{}", e);
    })?;

    let expected = self.slots.required_outputs();
    let actual = interpreter.num_outputs();
    if actual < expected {
      error!("预期模型输出数量至少为 {}, 实际为 {}", expected, actual);
      return Err(EfficientDetError::OutputCountMismatch { expected, actual });
    }

    debug!(
      "模型输入尺寸: {}x{}x{}",
      input.height, input.width, input.channels
    );
    debug!("输出槽位: {:?}", self.slots);
    debug!("解码配置: {:?}", self.config);
    if labels.is_empty() {
      warn!("标签表为空，所有类别将解析为 '?'");
    }
    info!("模型构建完成");

    Ok(EfficientDet {
      interpreter,
      input,
      slots: self.slots,
      decoder: DetectionDecoder::new(self.config),
      labels,
    })
  }
}

pub struct EfficientDet<I> {
  interpreter: I,
  input: InputShape,
  slots: OutputSlots,
  decoder: DetectionDecoder,
  labels: Arc<LabelTable>,
}

impl<I: Interpreter> EfficientDet<I> {
  pub fn input_shape(&self) -> InputShape {
    self.input
  }

  pub fn input_width(&self) -> usize {
    self.input.width
  }

  pub fn input_height(&self) -> usize {
    self.input.height
  }

  pub fn labels(&self) -> &Arc<LabelTable> {
    &self.labels
  }

  pub fn decoder(&self) -> &DetectionDecoder {
    &self.decoder
  }

  fn raw_outputs(&self) -> Result<RawOutputTensors<'_>, EfficientDetError> {
    let interpreter = &self.interpreter;
    let output = |slot| {
      interpreter
        .output(slot)
        .map_err(EfficientDetError::interpreter)
    };
    Ok(RawOutputTensors {
      locations: output(self.slots.locations)?,
      classes: output(self.slots.classes)?,
      scores: output(self.slots.scores)?,
      num_detections: self.slots.num_detections.map(output).transpose()?,
    })
  }
}

impl<I: Interpreter> Model for EfficientDet<I> {
  type Input = RgbNhwcFrame;
  type Output = DetectResult;
  type Error = EfficientDetError;

  fn infer(&mut self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let actual = (input.height(), input.width(), input.channels());
    if actual != self.input.as_tuple() {
      error!("输入帧尺寸不匹配: 期望 {:?}, 实际 {:?}", self.input, actual);
      return Err(EfficientDetError::FrameShapeMismatch {
        expected: self.input.as_tuple(),
        actual,
      });
    }

    debug!("执行模型推理");
    self
      .interpreter
      .invoke(input.as_nhwc())
      .map_err(EfficientDetError::interpreter)?;

    debug!("后处理模型输出");
    let tensors = self.raw_outputs()?;
    let records = self.decoder.decode(&tensors, &self.labels)?;
    Ok(DetectResult::from(records))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::{RecordedFrame, ReplayInterpreter};

  fn replay(frames: Vec<RecordedFrame>) -> ReplayInterpreter {
    ReplayInterpreter::new(vec![1, 2, 2, 3], frames)
  }

  fn frame(scores: [f32; 2], locations: [f32; 8], classes: [f32; 2]) -> RecordedFrame {
    RecordedFrame {
      outputs: vec![
        scores.to_vec(),
        locations.to_vec(),
        vec![2.0],
        classes.to_vec(),
      ],
    }
  }

  #[test]
  fn input_shape_is_read_as_nhwc() {
    let shape = InputShape::from_nhwc(&[1, 320, 448, 3]).unwrap();
    assert_eq!(shape.height, 320);
    assert_eq!(shape.width, 448);
    assert_eq!(shape.channels, 3);
    assert!(InputShape::from_nhwc(&[320, 320, 3]).is_err());
    assert!(InputShape::from_nhwc(&[1, 0, 320, 3]).is_err());
  }

  #[test]
  fn builder_reads_options_from_url() {
    let url = Url::parse(
      "effdet:///models/hole%20v2.tflite?max_detections=10&layout=tlbr&label_offset=1\
       &valid_count=honor&locations=0&classes=1&scores=2&count=none",
    )
    .unwrap();
    let builder = EfficientDetBuilder::from_url(&url).unwrap();
    assert_eq!(builder.model_path(), std::path::Path::new("/models/hole v2.tflite"));

    let config = builder.decoder_config();
    assert_eq!(config.max_detections, 10);
    assert_eq!(config.layout, BoxLayout::TopLeftBottomRight);
    assert_eq!(config.label_indexing, LabelIndexing::BackgroundOffset);
    assert_eq!(config.valid_count, ValidCount::Honor);
    assert_eq!(
      *builder.output_slots(),
      OutputSlots {
        locations: 0,
        classes: 1,
        scores: 2,
        num_detections: None
      }
    );
  }

  #[test]
  fn builder_defaults_follow_standard_export() {
    let builder = EfficientDetBuilder::from_url(&Url::parse("effdet:///m.tflite").unwrap()).unwrap();
    assert_eq!(*builder.decoder_config(), DecoderConfig::default());
    assert_eq!(*builder.output_slots(), OutputSlots::default());
    assert_eq!(builder.output_slots().required_outputs(), 4);
  }

  #[test]
  fn builder_rejects_bad_options() {
    for query in ["layout=xyxy", "label_offset=2", "max_detections=-1", "count=x"] {
      let url = Url::parse(&format!("effdet:///m.tflite?{query}")).unwrap();
      assert!(
        matches!(
          EfficientDetBuilder::from_url(&url),
          Err(EfficientDetError::InvalidOption { .. })
        ),
        "{query}"
      );
    }
    let url = Url::parse("tflite:///m.tflite").unwrap();
    assert!(matches!(
      EfficientDetBuilder::from_url(&url),
      Err(EfficientDetError::ModelPathError(_))
    ));
  }

  #[test]
  fn build_checks_output_count() {
    let interpreter = ReplayInterpreter::new(vec![1, 2, 2, 3], Vec::new());
    let result = EfficientDetBuilder::new("m.tflite")
      .build(interpreter, Arc::new(LabelTable::default()));
    assert!(matches!(
      result,
      Err(EfficientDetError::OutputCountMismatch { expected: 4, actual: 0 })
    ));
  }

  #[test]
  fn infer_decodes_configured_slots() {
    let labels = Arc::new(LabelTable::from_text(Some("hole\nscrew")));
    let interpreter = replay(vec![frame(
      [0.9, 0.1],
      [0.1, 0.2, 0.5, 0.6, 0.0, 0.0, 0.0, 0.0],
      [0.0, 1.0],
    )]);
    let mut model = EfficientDetBuilder::new("m.tflite")
      .max_detections(2)
      .build(interpreter, labels)
      .unwrap();

    let result = model.infer(&RgbNhwcFrame::with_shape(2, 2)).unwrap();
    assert_eq!(result.len(), 2);
    assert_eq!(result.items[0].label, "hole");
    assert!((result.items[0].score - 0.9).abs() < 1e-6);
    assert!((result.items[0].bbox.y - 0.9).abs() < 1e-6);
    assert_eq!(result.items[1].label, "screw");
  }

  #[test]
  fn records_survive_next_inference() {
    let labels = Arc::new(LabelTable::from_text(Some("hole")));
    let interpreter = replay(vec![
      frame([0.9, 0.8], [0.1, 0.1, 0.2, 0.2, 0.3, 0.3, 0.4, 0.4], [0.0, 0.0]),
      frame([0.2, 0.3], [0.5, 0.5, 0.6, 0.6, 0.7, 0.7, 0.8, 0.8], [0.0, 0.0]),
    ]);
    let mut model = EfficientDetBuilder::new("m.tflite")
      .max_detections(2)
      .build(interpreter, labels)
      .unwrap();

    let input = RgbNhwcFrame::with_shape(2, 2);
    let first = model.infer(&input).unwrap();
    let second = model.infer(&input).unwrap();
    assert!((first.items[0].score - 0.9).abs() < 1e-6);
    assert!((first.items[0].bbox.x - 0.1).abs() < 1e-6);
    assert!((second.items[0].score - 0.2).abs() < 1e-6);
    assert!((second.items[0].bbox.x - 0.5).abs() < 1e-6);
  }

  #[test]
  fn infer_rejects_wrong_frame_size() {
    let interpreter = replay(vec![frame([0.9, 0.1], [0.0; 8], [0.0, 0.0])]);
    let mut model = EfficientDetBuilder::new("m.tflite")
      .build(interpreter, Arc::new(LabelTable::default()))
      .unwrap();
    assert!(matches!(
      model.infer(&RgbNhwcFrame::with_shape(4, 4)),
      Err(EfficientDetError::FrameShapeMismatch { .. })
    ));
  }

  #[test]
  fn short_outputs_surface_decode_error() {
    let interpreter = replay(vec![frame([0.9, 0.1], [0.0; 8], [0.0, 0.0])]);
    let mut model = EfficientDetBuilder::new("m.tflite")
      .build(interpreter, Arc::new(LabelTable::default()))
      .unwrap();
    assert!(matches!(
      model.infer(&RgbNhwcFrame::with_shape(2, 2)),
      Err(EfficientDetError::Decode(DecodeError::InvalidArgument { .. }))
    ));
  }
}
