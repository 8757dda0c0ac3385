// 该文件是 Holedet （孔洞检测） 项目的一部分。
// src/input/blank.rs - 空白帧输入
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

use thiserror::Error;
use tracing::error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::RgbNhwcFrame};

#[derive(Error, Debug)]
pub enum BlankInputError {
  #[error("URI scheme mismatch")]
  SchemeMismatch,
  #[error("Invalid frame count: {0}")]
  InvalidFrameCount(String),
}

/// 生成全零帧，配合回放推理器使用，此时输出与输入内容无关
#[derive(Debug, Clone, Copy)]
pub struct BlankInput {
  frames: usize,
}

impl FromUrlWithScheme for BlankInput {
  const SCHEME: &'static str = "blank";
}

impl FromUrl for BlankInput {
  type Error = BlankInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(BlankInputError::SchemeMismatch);
    }

    let frames = match url.query_pairs().find(|(k, _)| k == "frames") {
      Some((_, v)) => v
        .parse()
        .map_err(|_| BlankInputError::InvalidFrameCount(v.to_string()))?,
      None => 1,
    };

    Ok(BlankInput { frames })
  }
}

impl BlankInput {
  pub fn new(frames: usize) -> Self {
    Self { frames }
  }

  pub fn into_nhwc(self, height: usize, width: usize) -> BlankInputNhwc {
    BlankInputNhwc {
      remaining: self.frames,
      height,
      width,
    }
  }
}

pub struct BlankInputNhwc {
  remaining: usize,
  height: usize,
  width: usize,
}

impl Iterator for BlankInputNhwc {
  type Item = RgbNhwcFrame;

  fn next(&mut self) -> Option<Self::Item> {
    if self.remaining == 0 {
      return None;
    }
    self.remaining -= 1;
    Some(RgbNhwcFrame::with_shape(self.height, self.width))
  }
}
