// 该文件是 Shibie （识别） 项目的一部分。
// src/model/yolov8.rs - YOLOv8 ONNX 模型
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

use std::{
  path::{Path, PathBuf},
  sync::{Arc, Mutex},
  time::Instant,
};

use image::imageops::{self, FilterType};
use ndarray::{Array4, ArrayViewD, Ix3};
use ort::{
  session::{Session, builder::GraphOptimizationLevel},
  value::Value,
};
use tracing::{debug, info, warn};

use crate::{
  frame::BgrFrame,
  model::{
    DetectItem, DetectResult, Model, ModelError, ModelLoader, ModelSelector, Speed,
    labels::{coco_labels, parse_names_metadata},
  },
};

const YOLOV8_INPUT_SIZE: u32 = 640;
const YOLOV8_PAD_VALUE: f32 = 114.0 / 255.0;
const YOLOV8_BOX_ATTRS: usize = 4;
const YOLOV8_CONFIDENCE: f32 = 0.25;
const YOLOV8_NMS_THRESHOLD: f32 = 0.7;
const YOLOV8_MAX_DETECTIONS: usize = 300;
const YOLOV8_INTRA_THREADS: usize = 4;

/// letterbox 变换参数，用于把输出框映射回原图
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Letterbox {
  pub scale: f32,
  pub pad_x: f32,
  pub pad_y: f32,
}

pub struct Yolov8 {
  session: Mutex<Session>,
  input_name: String,
  labels: Vec<String>,
  confidence: f32,
  nms_threshold: f32,
}

impl std::fmt::Debug for Yolov8 {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Yolov8")
      .field("input_name", &self.input_name)
      .field("labels", &self.labels.len())
      .field("confidence", &self.confidence)
      .field("nms_threshold", &self.nms_threshold)
      .finish_non_exhaustive()
  }
}

#[derive(Debug, Clone)]
pub struct Yolov8Builder {
  model_path: PathBuf,
  confidence: f32,
  nms_threshold: f32,
  intra_threads: usize,
}

impl Yolov8Builder {
  pub fn new(model_path: impl Into<PathBuf>) -> Self {
    Yolov8Builder {
      model_path: model_path.into(),
      confidence: YOLOV8_CONFIDENCE,
      nms_threshold: YOLOV8_NMS_THRESHOLD,
      intra_threads: YOLOV8_INTRA_THREADS,
    }
  }

  pub fn confidence(mut self, confidence: f32) -> Self {
    self.confidence = confidence.clamp(0.0, 1.0);
    self
  }

  pub fn nms_threshold(mut self, nms_threshold: f32) -> Self {
    self.nms_threshold = nms_threshold.clamp(0.0, 1.0);
    self
  }

  pub fn intra_threads(mut self, intra_threads: usize) -> Self {
    self.intra_threads = intra_threads.max(1);
    self
  }

  pub fn build(self) -> Result<Yolov8, ModelError> {
    if !self.model_path.exists() {
      return Err(ModelError::NotFound(self.model_path));
    }

    info!("加载模型文件: {}", self.model_path.display());
    let session = Session::builder()
      .map_err(ModelError::load)?
      .with_optimization_level(GraphOptimizationLevel::Level3)
      .map_err(ModelError::load)?
      .with_intra_threads(self.intra_threads)
      .map_err(ModelError::load)?
      .commit_from_file(&self.model_path)
      .map_err(ModelError::load)?;

    let input_name = session
      .inputs
      .first()
      .map(|input| input.name.clone())
      .ok_or_else(|| ModelError::Load("模型没有输入".to_string()))?;
    if session.outputs.is_empty() {
      return Err(ModelError::Load("模型没有输出".to_string()));
    }
    debug!("模型输入: {}, 输出数量: {}", input_name, session.outputs.len());

    let labels = match session
      .metadata()
      .and_then(|metadata| metadata.custom("names"))
    {
      Ok(Some(raw)) => parse_names_metadata(&raw).unwrap_or_else(|| {
        warn!("无法解析模型类别元数据，使用 COCO 类别");
        coco_labels()
      }),
      _ => coco_labels(),
    };
    info!("模型加载完成，类别数量: {}", labels.len());

    Ok(Yolov8 {
      session: Mutex::new(session),
      input_name,
      labels,
      confidence: self.confidence,
      nms_threshold: self.nms_threshold,
    })
  }
}

impl Model for Yolov8 {
  fn infer(&self, frame: &BgrFrame) -> Result<DetectResult, ModelError> {
    let now = Instant::now();
    let (tensor, letterbox) = preprocess(frame, YOLOV8_INPUT_SIZE);
    let preprocess = now.elapsed();

    let now = Instant::now();
    let mut session = self
      .session
      .lock()
      .map_err(|_| ModelError::Inference("推理会话锁已失效".to_string()))?;
    let input = Value::from_array(tensor).map_err(ModelError::inference)?;
    let outputs = session
      .run(ort::inputs![self.input_name.as_str() => input])
      .map_err(ModelError::inference)?;
    let inference = now.elapsed();

    let now = Instant::now();
    let output = outputs[0]
      .try_extract_array::<f32>()
      .map_err(ModelError::inference)?;
    debug!("模型输出形状: {:?}", output.shape());
    let items = postprocess(
      output,
      letterbox,
      (frame.width(), frame.height()),
      self.labels.len(),
      self.confidence,
      self.nms_threshold,
    )?;
    let postprocess = now.elapsed();

    debug!("检测到 {} 个物体", items.len());

    Ok(DetectResult {
      items: items.into_boxed_slice(),
      speed: Speed {
        preprocess,
        inference,
        postprocess,
      },
      width: frame.width(),
      height: frame.height(),
    })
  }

  fn labels(&self) -> &[String] {
    &self.labels
  }
}

/// 以 ONNX Runtime 加载 YOLOv8 权重
#[derive(Debug, Clone)]
pub struct OnnxLoader {
  confidence: f32,
  nms_threshold: f32,
}

impl OnnxLoader {
  pub fn new(confidence: f32, nms_threshold: f32) -> Self {
    OnnxLoader {
      confidence,
      nms_threshold,
    }
  }
}

impl Default for OnnxLoader {
  fn default() -> Self {
    OnnxLoader::new(YOLOV8_CONFIDENCE, YOLOV8_NMS_THRESHOLD)
  }
}

impl ModelLoader for OnnxLoader {
  fn load(&self, selector: ModelSelector, path: &Path) -> Result<Arc<dyn Model>, ModelError> {
    debug!("为档位 {} 构建 YOLOv8 模型", selector);
    let model = Yolov8Builder::new(path)
      .confidence(self.confidence)
      .nms_threshold(self.nms_threshold)
      .build()?;
    Ok(Arc::new(model))
  }
}

/// BGR 帧 -> letterbox 后的 RGB NCHW 张量，取值范围 [0, 1]
pub(crate) fn preprocess(frame: &BgrFrame, size: u32) -> (Array4<f32>, Letterbox) {
  let (width, height) = (frame.width(), frame.height());
  let scale = (size as f32 / width as f32).min(size as f32 / height as f32);
  let new_w = ((width as f32 * scale).round() as u32).clamp(1, size);
  let new_h = ((height as f32 * scale).round() as u32).clamp(1, size);
  let pad_x = (size - new_w) / 2;
  let pad_y = (size - new_h) / 2;

  // 模型按 RGB 训练，这里把 BGR 帧翻转回 RGB
  let rgb = frame.to_rgb_image();
  let resized = imageops::resize(&rgb, new_w, new_h, FilterType::Triangle);

  let side = size as usize;
  let mut tensor = Array4::from_elem((1, 3, side, side), YOLOV8_PAD_VALUE);
  for (x, y, pixel) in resized.enumerate_pixels() {
    let (tx, ty) = ((x + pad_x) as usize, (y + pad_y) as usize);
    for c in 0..3 {
      tensor[[0, c, ty, tx]] = pixel[c] as f32 / 255.0;
    }
  }

  let letterbox = Letterbox {
    scale,
    pad_x: pad_x as f32,
    pad_y: pad_y as f32,
  };
  (tensor, letterbox)
}

/// 解码 `[1, 4 + nc, N]`（或转置后的 `[1, N, 4 + nc]`）输出，
/// 过滤置信度后按类别做 NMS，框坐标映射回原图。
///
/// 布局按 `4 + num_classes` 所在的维度判断，两个维度都不匹配时
/// 才假定锚点数多于属性数。
pub(crate) fn postprocess(
  output: ArrayViewD<'_, f32>,
  letterbox: Letterbox,
  (width, height): (u32, u32),
  num_classes: usize,
  confidence: f32,
  nms_threshold: f32,
) -> Result<Vec<DetectItem>, ModelError> {
  let output = output
    .into_dimensionality::<Ix3>()
    .map_err(|e| ModelError::InvalidOutput(e.to_string()))?;

  let expected_attrs = YOLOV8_BOX_ATTRS + num_classes;
  let (dim1, dim2) = (output.shape()[1], output.shape()[2]);
  let transposed = match (dim1 == expected_attrs, dim2 == expected_attrs) {
    (true, _) => false,
    (false, true) => true,
    (false, false) => {
      warn!(
        "输出形状 {:?} 与类别数 {} 不符，按维度大小推断布局",
        output.shape(),
        num_classes
      );
      dim1 > dim2
    }
  };
  let output = if transposed {
    output.permuted_axes([0, 2, 1])
  } else {
    output
  };

  let (attrs, anchors) = (output.shape()[1], output.shape()[2]);
  if output.shape()[0] != 1 || attrs <= YOLOV8_BOX_ATTRS {
    return Err(ModelError::InvalidOutput(format!(
      "不支持的输出形状: {:?}",
      output.shape()
    )));
  }

  let (max_x, max_y) = (width as f32, height as f32);
  let mut candidates = Vec::new();
  for anchor in 0..anchors {
    let mut score = f32::MIN;
    let mut class_id = 0usize;
    for c in YOLOV8_BOX_ATTRS..attrs {
      let value = output[[0, c, anchor]];
      if value > score {
        score = value;
        class_id = c - YOLOV8_BOX_ATTRS;
      }
    }

    if !(score >= confidence) {
      continue;
    }

    let cx = output[[0, 0, anchor]];
    let cy = output[[0, 1, anchor]];
    let w = output[[0, 2, anchor]];
    let h = output[[0, 3, anchor]];

    let unpad_x = |v: f32| ((v - letterbox.pad_x) / letterbox.scale).clamp(0.0, max_x);
    let unpad_y = |v: f32| ((v - letterbox.pad_y) / letterbox.scale).clamp(0.0, max_y);

    candidates.push(DetectItem {
      class_id: class_id as u32,
      score,
      bbox: [
        unpad_x(cx - w / 2.0),
        unpad_y(cy - h / 2.0),
        unpad_x(cx + w / 2.0),
        unpad_y(cy + h / 2.0),
      ],
    });
  }

  debug!("置信度过滤后候选框: {}", candidates.len());
  let mut items = nms(candidates, nms_threshold);
  items.truncate(YOLOV8_MAX_DETECTIONS);
  Ok(items)
}

/// 按类别的非极大值抑制，结果按置信度降序
pub(crate) fn nms(mut candidates: Vec<DetectItem>, threshold: f32) -> Vec<DetectItem> {
  candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

  let mut kept: Vec<DetectItem> = Vec::new();
  for candidate in candidates {
    let suppressed = kept
      .iter()
      .any(|k| k.class_id == candidate.class_id && iou(&k.bbox, &candidate.bbox) > threshold);
    if !suppressed {
      kept.push(candidate);
    }
  }
  kept
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
  let x1 = a[0].max(b[0]);
  let y1 = a[1].max(b[1]);
  let x2 = a[2].min(b[2]);
  let y2 = a[3].min(b[3]);

  let intersection = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let area_a = (a[2] - a[0]) * (a[3] - a[1]);
  let area_b = (b[2] - b[0]) * (b[3] - b[1]);
  let union = area_a + area_b - intersection;

  if union > 0.0 { intersection / union } else { 0.0 }
}
