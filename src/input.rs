// 该文件是 Shibie （识别） 项目的一部分。
// src/input.rs - 图像输入解码
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use image::ImageFormat;
use thiserror::Error;
use tracing::debug;

use crate::frame::BgrFrame;

mod read_image_file;
pub use self::read_image_file::decode_image_file;

#[derive(Error, Debug)]
pub enum DecodeError {
  #[error("Image data is empty")]
  Empty,
  #[error("Unsupported image format, expected JPEG or PNG")]
  UnsupportedFormat,
  #[error("Failed to decode image: {0}")]
  Corrupted(#[from] image::ImageError),
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
}

/// 将上传的原始字节解码为 BGR 帧。
///
/// 格式按内容嗅探，不信任文件名，只接受 JPEG 与 PNG。
pub fn decode_image(bytes: &[u8]) -> Result<BgrFrame, DecodeError> {
  if bytes.is_empty() {
    return Err(DecodeError::Empty);
  }

  let format = match image::guess_format(bytes) {
    Ok(format @ (ImageFormat::Jpeg | ImageFormat::Png)) => format,
    _ => return Err(DecodeError::UnsupportedFormat),
  };

  let image = image::load_from_memory_with_format(bytes, format)?.into_rgb8();
  debug!(
    "解码图像: {:?} {}x{}, {} 字节",
    format,
    image.width(),
    image.height(),
    bytes.len()
  );

  Ok(BgrFrame::from_rgb(&image))
}
