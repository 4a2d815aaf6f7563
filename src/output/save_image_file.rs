// 该文件是 Shibie （识别） 项目的一部分。
// src/output/save_image_file.rs - 保存图像文件
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

use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::debug;

use crate::{
  frame::BgrFrame,
  model::DetectResult,
  output::{DEFAULT_RENDER_PATH, Render, RenderError, draw::Draw},
};

/// 写入固定路径的渲染输出。
///
/// 所有请求共用同一个文件，并发请求会互相覆盖，响应中引用的文件
/// 可能已经是另一次请求的结果。
pub struct SaveImageFileOutput {
  path: PathBuf,
  draw: Draw,
}

impl Default for SaveImageFileOutput {
  fn default() -> Self {
    SaveImageFileOutput::new(DEFAULT_RENDER_PATH)
  }
}

impl SaveImageFileOutput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    SaveImageFileOutput {
      path: path.into(),
      draw: Draw::default(),
    }
  }

  pub fn with_draw(mut self, draw: Draw) -> Self {
    self.draw = draw;
    self
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  fn save_image(&self, image: RgbImage) -> Result<(), RenderError> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    image.save(&self.path)?;
    debug!("保存图像到文件: {}", self.path.display());

    Ok(())
  }
}

impl Render for SaveImageFileOutput {
  fn render_result(
    &self,
    frame: &BgrFrame,
    result: &DetectResult,
    labels: &[String],
  ) -> Result<PathBuf, RenderError> {
    let image = self.draw.draw_detection(frame, result, labels);
    self.save_image(image)?;
    Ok(self.path.clone())
  }
}
