// 该文件是 Shibie （识别） 项目的一部分。
// tests/common/mod.rs - 集成测试共用工具
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

#![allow(dead_code)]

use std::{
  io::Cursor,
  path::Path,
  sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
  },
};

use image::{ImageFormat, Rgb, RgbImage};
use shibie::{
  frame::BgrFrame,
  model::{
    DetectItem, DetectResult, Model, ModelError, ModelLoader, ModelPaths, ModelRegistry,
    ModelSelector, Speed,
  },
  task::DetectTask,
};

pub const BOUNDARY: &str = "shibie-test-boundary";

/// 纯红色（BGR [0, 0, 255]）像素的外接框就是唯一的检测目标
pub struct RedBlobModel;

impl Model for RedBlobModel {
  fn infer(&self, frame: &BgrFrame) -> Result<DetectResult, ModelError> {
    let mut bbox: Option<[u32; 4]> = None;
    for y in 0..frame.height() {
      for x in 0..frame.width() {
        if frame.pixel(x, y) == [0, 0, 255] {
          bbox = Some(match bbox {
            None => [x, y, x + 1, y + 1],
            Some([x0, y0, x1, y1]) => [x0.min(x), y0.min(y), x1.max(x + 1), y1.max(y + 1)],
          });
        }
      }
    }

    let items: Vec<DetectItem> = bbox
      .into_iter()
      .map(|b| DetectItem {
        class_id: 0,
        score: 0.91,
        bbox: b.map(|v| v as f32),
      })
      .collect();

    Ok(DetectResult {
      items: items.into_boxed_slice(),
      speed: Speed::default(),
      width: frame.width(),
      height: frame.height(),
    })
  }

  fn labels(&self) -> &[String] {
    static LABELS: std::sync::OnceLock<Vec<String>> = std::sync::OnceLock::new();
    LABELS.get_or_init(|| vec!["person".to_string()])
  }
}

#[derive(Default)]
pub struct RedBlobLoader {
  pub loads: AtomicUsize,
}

impl RedBlobLoader {
  pub fn loads(&self) -> usize {
    self.loads.load(Ordering::SeqCst)
  }
}

impl ModelLoader for RedBlobLoader {
  fn load(&self, _selector: ModelSelector, _path: &Path) -> Result<Arc<dyn Model>, ModelError> {
    self.loads.fetch_add(1, Ordering::SeqCst);
    Ok(Arc::new(RedBlobModel))
  }
}

/// 权重文件缺失的情形
pub struct MissingWeightsLoader;

impl ModelLoader for MissingWeightsLoader {
  fn load(&self, _selector: ModelSelector, path: &Path) -> Result<Arc<dyn Model>, ModelError> {
    Err(ModelError::NotFound(path.to_path_buf()))
  }
}

pub fn task_with(loader: Arc<dyn ModelLoader>) -> DetectTask {
  DetectTask::new(ModelRegistry::new(ModelPaths::default(), loader))
}

pub fn encode(image: &RgbImage, format: ImageFormat) -> Vec<u8> {
  let mut buffer = Cursor::new(Vec::new());
  image.write_to(&mut buffer, format).unwrap();
  buffer.into_inner()
}

/// 灰色背景上的红色矩形，`rect` 为 [x0, y0, x1, y1)
pub fn red_square(width: u32, height: u32, rect: [u32; 4]) -> RgbImage {
  let [x0, y0, x1, y1] = rect;
  RgbImage::from_fn(width, height, |x, y| {
    if (x0..x1).contains(&x) && (y0..y1).contains(&y) {
      Rgb([255, 0, 0])
    } else {
      Rgb([90, 90, 90])
    }
  })
}

pub fn red_square_png(width: u32, height: u32, rect: [u32; 4]) -> Vec<u8> {
  encode(&red_square(width, height, rect), ImageFormat::Png)
}

pub enum Part<'a> {
  File {
    name: &'a str,
    file_name: &'a str,
    content_type: &'a str,
    data: &'a [u8],
  },
  Text {
    name: &'a str,
    value: &'a str,
  },
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
  let mut body = Vec::new();
  for part in parts {
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    match part {
      Part::File {
        name,
        file_name,
        content_type,
        data,
      } => {
        body.extend_from_slice(
          format!(
            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
          )
          .as_bytes(),
        );
        body.extend_from_slice(data);
      }
      Part::Text { name, value } => {
        body.extend_from_slice(
          format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}").as_bytes(),
        );
      }
    }
    body.extend_from_slice(b"\r\n");
  }
  body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
  body
}
