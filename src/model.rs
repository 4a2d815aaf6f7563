// 该文件是 Shibie （识别） 项目的一部分。
// src/model.rs - 模型
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

use std::{fmt, path::PathBuf, str::FromStr, time::Duration};

use thiserror::Error;

use crate::frame::BgrFrame;

pub mod labels;
mod registry;
mod yolov8;

pub use self::registry::{ModelLoader, ModelPaths, ModelRegistry, RegistryError};
pub use self::yolov8::{OnnxLoader, Yolov8, Yolov8Builder};

#[derive(Error, Debug)]
pub enum ModelError {
  #[error("模型文件不存在: {}", .0.display())]
  NotFound(PathBuf),
  #[error("模型加载错误: {0}")]
  Load(String),
  #[error("推理错误: {0}")]
  Inference(String),
  #[error("模型输出无效: {0}")]
  InvalidOutput(String),
}

impl ModelError {
  pub fn load(e: impl fmt::Display) -> Self {
    ModelError::Load(e.to_string())
  }

  pub fn inference(e: impl fmt::Display) -> Self {
    ModelError::Inference(e.to_string())
  }
}

/// 模型质量档位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelSelector {
  Fast,
  Accurate,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid model type '{0}'. Available options: [fast, accurate].")]
pub struct InvalidModelSelector(pub String);

impl ModelSelector {
  pub const ALL: [ModelSelector; 2] = [ModelSelector::Fast, ModelSelector::Accurate];

  pub fn as_str(&self) -> &'static str {
    match self {
      ModelSelector::Fast => "fast",
      ModelSelector::Accurate => "accurate",
    }
  }

  pub fn default_weights(&self) -> &'static str {
    match self {
      ModelSelector::Fast => "models/yolov8n.onnx",
      ModelSelector::Accurate => "models/yolov8x.onnx",
    }
  }

  pub(crate) fn index(self) -> usize {
    match self {
      ModelSelector::Fast => 0,
      ModelSelector::Accurate => 1,
    }
  }
}

impl FromStr for ModelSelector {
  type Err = InvalidModelSelector;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    ModelSelector::ALL
      .into_iter()
      .find(|selector| selector.as_str() == s)
      .ok_or_else(|| InvalidModelSelector(s.to_string()))
  }
}

impl fmt::Display for ModelSelector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectItem {
  pub class_id: u32,
  pub score: f32,
  pub bbox: [f32; 4], // [x_min, y_min, x_max, y_max]，原图像素坐标
}

/// 各阶段耗时
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Speed {
  pub preprocess: Duration,
  pub inference: Duration,
  pub postprocess: Duration,
}

#[derive(Debug, Clone)]
pub struct DetectResult {
  pub items: Box<[DetectItem]>,
  pub speed: Speed,
  pub width: u32,
  pub height: u32,
}

impl DetectResult {
  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }
}

/// 已加载、可直接推理的检测模型
pub trait Model: Send + Sync {
  /// 对一帧执行检测，不修改输入
  fn infer(&self, frame: &BgrFrame) -> Result<DetectResult, ModelError>;

  /// 类别名称表，下标即类别 id
  fn labels(&self) -> &[String];
}
