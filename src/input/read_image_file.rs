// 该文件是 Holedet （孔洞检测） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use crate::{FromUrl, FromUrlWithScheme, frame::RgbNhwcFrame};

use image::{ImageReader, RgbImage, imageops::FilterType};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(#[from] image::ImageError),
}

/// 单张图片输入，推理前拉伸到模型输入尺寸
pub struct ImageFileInput {
  image: Option<RgbImage>,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let path = crate::url_file_path(url);
    let image = ImageReader::open(&path)?.decode()?;
    debug!(
      "读取图片 {}: {}x{}",
      path.display(),
      image.width(),
      image.height()
    );

    Ok(ImageFileInput {
      image: Some(image.to_rgb8()),
    })
  }
}

impl From<RgbImage> for ImageFileInput {
  fn from(image: RgbImage) -> Self {
    ImageFileInput { image: Some(image) }
  }
}

impl ImageFileInput {
  pub fn into_nhwc(self, height: usize, width: usize) -> ImageFileInputNhwc {
    ImageFileInputNhwc {
      inner: self,
      height,
      width,
    }
  }
}

pub struct ImageFileInputNhwc {
  inner: ImageFileInput,
  height: usize,
  width: usize,
}

impl Iterator for ImageFileInputNhwc {
  type Item = RgbNhwcFrame;

  fn next(&mut self) -> Option<Self::Item> {
    let (height, width) = (self.height, self.width);
    self
      .inner
      .image
      .take()
      .map(|image| resize_to_frame(&image, height, width))
  }
}

fn resize_to_frame(image: &RgbImage, height: usize, width: usize) -> RgbNhwcFrame {
  let resized = image::imageops::resize(image, width as u32, height as u32, FilterType::Triangle);
  let mut frame = RgbNhwcFrame::with_shape(height, width);
  // RgbImage 的原始数据本身就是 HWC 排列
  frame.as_mut().copy_from_slice(resized.as_raw());
  frame
}
