// 该文件是 Holedet （孔洞检测） 项目的一部分。
// src/input.rs - 图像输入
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

use crate::{FromUrl, FromUrlWithScheme, frame::RgbNhwcFrame};

#[cfg(feature = "read_image_file")]
mod read_image_file;
#[cfg(feature = "read_image_file")]
pub use self::read_image_file::{ImageFileInput, ImageFileInputError, ImageFileInputNhwc};

mod blank;
pub use self::blank::{BlankInput, BlankInputError, BlankInputNhwc};

#[derive(Error, Debug)]
pub enum InputError {
  #[cfg(feature = "read_image_file")]
  #[error("Image file input error: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[error("Blank input error: {0}")]
  BlankInputError(#[from] BlankInputError),
  #[error("URI scheme mismatch")]
  SchemeMismatch,
}

pub enum InputWrapper {
  #[cfg(feature = "read_image_file")]
  ReadImageFile(ImageFileInput),
  Blank(BlankInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &url::Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "read_image_file")]
    {
      if url.scheme() == ImageFileInput::SCHEME {
        let input = ImageFileInput::from_url(url)?;
        return Ok(InputWrapper::ReadImageFile(input));
      }
    }
    if url.scheme() == BlankInput::SCHEME {
      let input = BlankInput::from_url(url)?;
      return Ok(InputWrapper::Blank(input));
    }
    Err(InputError::SchemeMismatch)
  }
}

impl InputWrapper {
  /// 按模型输入尺寸生成帧
  pub fn into_nhwc(self, height: usize, width: usize) -> InputWrapperNhwcIter {
    match self {
      #[cfg(feature = "read_image_file")]
      InputWrapper::ReadImageFile(input) => {
        InputWrapperNhwcIter::ReadImageFile(input.into_nhwc(height, width))
      }
      InputWrapper::Blank(input) => InputWrapperNhwcIter::Blank(input.into_nhwc(height, width)),
    }
  }
}

pub enum InputWrapperNhwcIter {
  #[cfg(feature = "read_image_file")]
  ReadImageFile(ImageFileInputNhwc),
  Blank(BlankInputNhwc),
}

impl Iterator for InputWrapperNhwcIter {
  type Item = RgbNhwcFrame;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      #[cfg(feature = "read_image_file")]
      InputWrapperNhwcIter::ReadImageFile(input) => input.next(),
      InputWrapperNhwcIter::Blank(input) => input.next(),
    }
  }
}
