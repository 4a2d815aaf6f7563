// 该文件是 Shibie （识别） 项目的一部分。
// src/test_utils.rs - 单元测试共用工具
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

use std::{io::Cursor, path::Path, sync::Arc};

use image::{ImageFormat, Rgb, RgbImage};

use crate::{
  frame::BgrFrame,
  model::{DetectItem, DetectResult, Model, ModelError, ModelLoader, ModelSelector, Speed},
};

/// 把与目标 BGR 颜色完全相同的像素视为一个物体。
///
/// 只认 BGR 顺序，所以通道翻转出错时测试会直接失败。
pub(crate) struct ColorBlobModel {
  pub target: [u8; 3],
  pub class_id: u32,
  pub score: f32,
  pub labels: Vec<String>,
}

impl Default for ColorBlobModel {
  fn default() -> Self {
    ColorBlobModel {
      target: [0, 0, 255],
      class_id: 1,
      score: 0.87,
      labels: vec!["person".to_string(), "stop sign".to_string()],
    }
  }
}

impl Model for ColorBlobModel {
  fn infer(&self, frame: &BgrFrame) -> Result<DetectResult, ModelError> {
    let mut bbox: Option<[u32; 4]> = None;
    for y in 0..frame.height() {
      for x in 0..frame.width() {
        if frame.pixel(x, y) != self.target {
          continue;
        }
        bbox = Some(match bbox {
          None => [x, y, x + 1, y + 1],
          Some([x0, y0, x1, y1]) => [x0.min(x), y0.min(y), x1.max(x + 1), y1.max(y + 1)],
        });
      }
    }

    let items = bbox
      .map(|b| DetectItem {
        class_id: self.class_id,
        score: self.score,
        bbox: b.map(|v| v as f32),
      })
      .into_iter()
      .collect::<Vec<_>>();

    Ok(DetectResult {
      items: items.into_boxed_slice(),
      speed: Speed::default(),
      width: frame.width(),
      height: frame.height(),
    })
  }

  fn labels(&self) -> &[String] {
    &self.labels
  }
}

pub(crate) struct ColorBlobLoader;

impl ModelLoader for ColorBlobLoader {
  fn load(&self, _selector: ModelSelector, _path: &Path) -> Result<Arc<dyn Model>, ModelError> {
    Ok(Arc::new(ColorBlobModel::default()))
  }
}

/// 灰色背景上画一个纯红色矩形，编码为 PNG
pub(crate) fn red_square_png(width: u32, height: u32, rect: [u32; 4]) -> Vec<u8> {
  let [x0, y0, x1, y1] = rect;
  let image = RgbImage::from_fn(width, height, |x, y| {
    if (x0..x1).contains(&x) && (y0..y1).contains(&y) {
      Rgb([255, 0, 0])
    } else {
      Rgb([90, 90, 90])
    }
  });

  let mut buffer = Cursor::new(Vec::new());
  image
    .write_to(&mut buffer, ImageFormat::Png)
    .expect("PNG 编码失败");
  buffer.into_inner()
}
