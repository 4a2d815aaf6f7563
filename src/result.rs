// 该文件是 Shibie （识别） 项目的一部分。
// src/result.rs - 检测结果规范化
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

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{DetectItem, DetectResult, Speed};

/// 对外输出的单个检测目标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
  pub object: String,
  pub confidence: f32,
  pub x_min: f32,
  pub y_min: f32,
  pub x_max: f32,
  pub y_max: f32,
}

/// 各阶段耗时，单位毫秒
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeedMetrics {
  pub preprocess: f64,
  pub inference: f64,
  pub postprocess: f64,
}

impl From<Speed> for SpeedMetrics {
  fn from(speed: Speed) -> Self {
    let ms = |d: Duration| d.as_secs_f64() * 1000.0;
    SpeedMetrics {
      preprocess: ms(speed.preprocess),
      inference: ms(speed.inference),
      postprocess: ms(speed.postprocess),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
  pub detected_objects: Vec<DetectionRecord>,
  pub speed: SpeedMetrics,
  pub inferred_image_path: Option<String>,
}

/// 把类别 id 解析为名称，表外的 id 记为 `class_<id>`
pub fn label_name(labels: &[String], class_id: u32) -> String {
  labels
    .get(class_id as usize)
    .cloned()
    .unwrap_or_else(|| format!("class_{class_id}"))
}

/// 模型原始输出 -> 可序列化的结果，图像路径由调用方填写。
///
/// 置信度截断到 [0, 1]，坐标截断到图像范围内并保证 min <= max，
/// 含非有限值的目标会被丢弃。
pub fn normalize(result: &DetectResult, labels: &[String]) -> InferenceResult {
  let detected_objects = result
    .items
    .iter()
    .filter_map(|item| to_record(item, labels, result.width as f32, result.height as f32))
    .collect::<Vec<_>>();

  if detected_objects.len() != result.items.len() {
    debug!(
      "丢弃 {} 个含非有限值的目标",
      result.items.len() - detected_objects.len()
    );
  }

  InferenceResult {
    detected_objects,
    speed: result.speed.into(),
    inferred_image_path: None,
  }
}

fn to_record(item: &DetectItem, labels: &[String], width: f32, height: f32) -> Option<DetectionRecord> {
  if !item.score.is_finite() || item.bbox.iter().any(|v| !v.is_finite()) {
    return None;
  }

  let [x0, y0, x1, y1] = item.bbox;
  let (x0, x1) = (x0.clamp(0.0, width), x1.clamp(0.0, width));
  let (y0, y1) = (y0.clamp(0.0, height), y1.clamp(0.0, height));

  Some(DetectionRecord {
    object: label_name(labels, item.class_id),
    confidence: item.score.clamp(0.0, 1.0),
    x_min: x0.min(x1),
    y_min: y0.min(y1),
    x_max: x0.max(x1),
    y_max: y0.max(y1),
  })
}
