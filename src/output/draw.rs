// 该文件是 Shibie （识别） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
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

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};

use tracing::warn;

use crate::{
  frame::BgrFrame,
  model::{DetectItem, DetectResult},
  output::RenderError,
  result::label_name,
};

// 文本渲染常量
const LABEL_FONT_SIZE: f32 = 20.0;
const LABEL_TEXT_VERTICAL_PADDING: i32 = 2;
const LABEL_TEXT_COLOR: [u8; 3] = [255, 255, 255];
const PALETTE_SIZE: usize = 80;
const BOX_THICKNESS: u32 = 2;

// DejaVu Sans，许可见 assets/FONT_LICENSE
static DEFAULT_FONT: &[u8] = include_bytes!("../../assets/font.ttf");

pub struct Draw {
  font: Option<FontArc>,
  font_size: f32,
  label_text_vertical_padding: i32,
  colors: Vec<Rgb<u8>>,
}

impl Default for Draw {
  fn default() -> Self {
    // 每个类别一种颜色
    let colors = (0..PALETTE_SIZE)
      .map(|i| hsv_to_rgb((i as f32 / PALETTE_SIZE as f32) * 360.0, 0.8, 0.9))
      .collect();

    let font = FontArc::try_from_slice(DEFAULT_FONT)
      .map_err(|e| warn!("无法加载内置字体，只绘制检测框: {}", e))
      .ok();

    Self {
      font,
      font_size: LABEL_FONT_SIZE,
      label_text_vertical_padding: LABEL_TEXT_VERTICAL_PADDING,
      colors,
    }
  }
}

impl Draw {
  /// 替换内置字体
  pub fn with_font(mut self, font: FontArc) -> Self {
    self.font = Some(font);
    self
  }

  pub fn load_font(path: impl AsRef<Path>) -> Result<FontArc, RenderError> {
    let data = std::fs::read(path)?;
    FontArc::try_from_vec(data).map_err(|e| RenderError::InvalidFont(e.to_string()))
  }

  pub fn has_font(&self) -> bool {
    self.font.is_some()
  }

  pub fn color(&self, class_id: u32) -> Rgb<u8> {
    self.colors[class_id as usize % self.colors.len()]
  }

  /// 在帧的 RGB 副本上绘制全部检测结果
  pub fn draw_detection(&self, frame: &BgrFrame, result: &DetectResult, labels: &[String]) -> RgbImage {
    let mut image = frame.to_rgb_image();
    for item in result.items.iter() {
      self.draw_bbox_with_label(&mut image, item, labels);
    }
    image
  }

  // bbox 为原图像素坐标 [x_min, y_min, x_max, y_max]
  fn draw_bbox_with_label(&self, image: &mut RgbImage, item: &DetectItem, labels: &[String]) {
    let (w, h) = (image.width() as i32, image.height() as i32);
    if w == 0 || h == 0 || item.bbox.iter().any(|v| !v.is_finite()) {
      return;
    }

    let x_min = (item.bbox[0].floor() as i32).clamp(0, w - 1);
    let y_min = (item.bbox[1].floor() as i32).clamp(0, h - 1);
    let x_max = (item.bbox[2].ceil() as i32).clamp(0, w - 1);
    let y_max = (item.bbox[3].ceil() as i32).clamp(0, h - 1);

    if x_min >= x_max || y_min >= y_max {
      return;
    }

    let color = self.color(item.class_id);
    let (box_w, box_h) = ((x_max - x_min + 1) as u32, (y_max - y_min + 1) as u32);
    for t in 0..BOX_THICKNESS {
      if box_w <= 2 * t || box_h <= 2 * t {
        break;
      }
      let rect = Rect::at(x_min + t as i32, y_min + t as i32).of_size(box_w - 2 * t, box_h - 2 * t);
      draw_hollow_rect_mut(image, rect, color);
    }

    let Some(font) = &self.font else {
      return;
    };

    let label = format!("{} {:.2}", label_name(labels, item.class_id), item.score);
    let scale = PxScale::from(self.font_size);
    let (text_w, text_h) = text_size(scale, font, &label);
    let label_h = text_h as i32 + 2 * self.label_text_vertical_padding;

    // 标签放在框上方，空间不够时贴着图像顶部
    let label_x = x_min;
    let label_y = (y_min - label_h).max(0);
    let label_w = (text_w as i32).min(w - label_x);

    if label_w > 0 && label_h > 0 {
      let rect = Rect::at(label_x, label_y).of_size(label_w as u32, label_h as u32);
      draw_filled_rect_mut(image, rect, color);
      draw_text_mut(
        image,
        Rgb(LABEL_TEXT_COLOR),
        label_x,
        label_y + self.label_text_vertical_padding,
        scale,
        font,
        &label,
      );
    }
  }
}

/// HSV 转 RGB
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> Rgb<u8> {
  let c = v * s;
  let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
  let m = v - c;

  let (r, g, b) = match h {
    h if h < 60.0 => (c, x, 0.0),
    h if h < 120.0 => (x, c, 0.0),
    h if h < 180.0 => (0.0, c, x),
    h if h < 240.0 => (0.0, x, c),
    h if h < 300.0 => (x, 0.0, c),
    _ => (c, 0.0, x),
  };

  Rgb([
    ((r + m) * 255.0) as u8,
    ((g + m) * 255.0) as u8,
    ((b + m) * 255.0) as u8,
  ])
}
