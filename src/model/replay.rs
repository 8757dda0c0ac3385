// 该文件是 Holedet （孔洞检测） 项目的一部分。
// src/model/replay.rs - 录制张量回放推理器
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

use std::{collections::VecDeque, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::model::Interpreter;

#[derive(Error, Debug)]
pub enum ReplayError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("张量文件格式错误: {0}")]
  FormatError(#[from] serde_json::Error),
  #[error("录制的推理结果已全部回放")]
  Exhausted,
  #[error("输入数据长度不匹配: 期望 {expected}, 实际 {actual}")]
  InputSizeMismatch { expected: usize, actual: usize },
  #[error("第 {frame} 帧输出数量为 {actual}, 与首帧的 {expected} 不一致")]
  OutputCountMismatch {
    frame: usize,
    expected: usize,
    actual: usize,
  },
  #[error("输出槽位 {slot} 不存在（共 {count} 个）")]
  NoSuchOutput { slot: usize, count: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
  pub outputs: Vec<Vec<f32>>,
}

/// 录制的推理输出文件格式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorDump {
  pub input_shape: Vec<usize>,
  pub frames: Vec<RecordedFrame>,
}

/// 依次回放录制的输出张量，每次 `invoke` 原地覆盖输出缓冲区
#[derive(Debug)]
pub struct ReplayInterpreter {
  input_shape: Vec<usize>,
  pending: VecDeque<RecordedFrame>,
  outputs: Vec<Vec<f32>>,
  invoked: usize,
}

impl ReplayInterpreter {
  pub fn new(input_shape: Vec<usize>, frames: Vec<RecordedFrame>) -> Self {
    let outputs = frames
      .first()
      .map(|frame| vec![Vec::new(); frame.outputs.len()])
      .unwrap_or_default();

    Self {
      input_shape,
      pending: frames.into(),
      outputs,
      invoked: 0,
    }
  }

  pub fn open(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
    let path = path.as_ref();
    info!("读取录制张量: {}", path.display());
    let text = std::fs::read_to_string(path)?;
    let dump: TensorDump = serde_json::from_str(&text)?;
    debug!("录制帧数: {}", dump.frames.len());
    Ok(Self::from(dump))
  }

  pub fn remaining(&self) -> usize {
    self.pending.len()
  }
}

impl From<TensorDump> for ReplayInterpreter {
  fn from(dump: TensorDump) -> Self {
    Self::new(dump.input_shape, dump.frames)
  }
}

impl Interpreter for ReplayInterpreter {
  type Error = ReplayError;

  fn input_shape(&self) -> &[usize] {
    &self.input_shape
  }

  fn num_outputs(&self) -> usize {
    self.outputs.len()
  }

  fn invoke(&mut self, input: &[u8]) -> Result<(), Self::Error> {
    let expected: usize = self.input_shape.iter().product();
    if input.len() != expected {
      return Err(ReplayError::InputSizeMismatch {
        expected,
        actual: input.len(),
      });
    }

    let next = self.pending.front().ok_or(ReplayError::Exhausted)?;
    if next.outputs.len() != self.outputs.len() {
      return Err(ReplayError::OutputCountMismatch {
        frame: self.invoked,
        expected: self.outputs.len(),
        actual: next.outputs.len(),
      });
    }
    let frame = self.pending.pop_front().ok_or(ReplayError::Exhausted)?;

    for (buffer, recorded) in self.outputs.iter_mut().zip(frame.outputs) {
      buffer.clear();
      buffer.extend_from_slice(&recorded);
    }
    self.invoked += 1;
    debug!("回放第 {} 帧输出", self.invoked);
    Ok(())
  }

  fn output(&self, slot: usize) -> Result<&[f32], Self::Error> {
    self
      .outputs
      .get(slot)
      .map(Vec::as_slice)
      .ok_or(ReplayError::NoSuchOutput {
        slot,
        count: self.outputs.len(),
      })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn dump() -> TensorDump {
    TensorDump {
      input_shape: vec![1, 1, 2, 3],
      frames: vec![
        RecordedFrame {
          outputs: vec![vec![0.1, 0.2], vec![1.0]],
        },
        RecordedFrame {
          outputs: vec![vec![0.3], vec![2.0]],
        },
      ],
    }
  }

  #[test]
  fn invoke_overwrites_outputs_in_place() {
    let mut interpreter = ReplayInterpreter::from(dump());
    assert_eq!(interpreter.num_outputs(), 2);
    assert_eq!(interpreter.output(0).unwrap(), &[] as &[f32]);

    interpreter.invoke(&[0; 6]).unwrap();
    assert_eq!(interpreter.output(0).unwrap(), &[0.1_f32, 0.2]);
    let copied = interpreter.output(1).unwrap().to_vec();

    interpreter.invoke(&[0; 6]).unwrap();
    assert_eq!(interpreter.output(0).unwrap(), &[0.3_f32]);
    assert_eq!(interpreter.output(1).unwrap(), &[2.0_f32]);
    assert_eq!(copied, vec![1.0_f32]);

    assert!(matches!(
      interpreter.invoke(&[0; 6]),
      Err(ReplayError::Exhausted)
    ));
  }

  #[test]
  fn invoke_checks_input_size_and_slots() {
    let mut interpreter = ReplayInterpreter::from(dump());
    assert!(matches!(
      interpreter.invoke(&[0; 5]),
      Err(ReplayError::InputSizeMismatch {
        expected: 6,
        actual: 5
      })
    ));
    assert_eq!(interpreter.remaining(), 2);
    assert!(matches!(
      interpreter.output(7),
      Err(ReplayError::NoSuchOutput { slot: 7, count: 2 })
    ));
  }

  #[test]
  fn malformed_frame_stays_pending() {
    let mut interpreter = ReplayInterpreter::from(TensorDump {
      input_shape: vec![1, 1, 2, 3],
      frames: vec![
        RecordedFrame {
          outputs: vec![vec![0.1], vec![1.0]],
        },
        RecordedFrame {
          outputs: vec![vec![0.2]],
        },
      ],
    });
    interpreter.invoke(&[0; 6]).unwrap();

    for _ in 0..2 {
      assert!(matches!(
        interpreter.invoke(&[0; 6]),
        Err(ReplayError::OutputCountMismatch {
          expected: 2,
          actual: 1,
          ..
        })
      ));
      assert_eq!(interpreter.remaining(), 1);
    }
    assert_eq!(interpreter.output(0).unwrap(), &[0.1_f32]);
  }

  #[test]
  fn opens_json_dump() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dump.json");
    std::fs::write(&path, serde_json::to_string(&dump()).unwrap()).unwrap();

    let interpreter = ReplayInterpreter::open(&path).unwrap();
    assert_eq!(interpreter.input_shape(), &[1_usize, 1, 2, 3]);
    assert_eq!(interpreter.remaining(), 2);

    std::fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
      ReplayInterpreter::open(&path),
      Err(ReplayError::FormatError(_))
    ));
  }
}
