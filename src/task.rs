// 该文件是 Shibie （识别） 项目的一部分。
// src/task.rs - 检测任务
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

use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinError;
use tracing::{debug, info, warn};

use crate::{
  frame::BgrFrame,
  input::{DecodeError, decode_image},
  model::{InvalidModelSelector, Model, ModelError, ModelRegistry, ModelSelector, RegistryError},
  output::Render,
  result::{InferenceResult, normalize},
};

#[derive(Error, Debug)]
pub enum TaskError {
  #[error("Invalid image: {0}")]
  Decode(#[from] DecodeError),
  #[error(transparent)]
  InvalidSelector(#[from] InvalidModelSelector),
  #[error("Model {selector} could not be loaded: {source}")]
  ModelLoad {
    selector: ModelSelector,
    #[source]
    source: ModelError,
  },
  #[error("Inference failed: {0}")]
  Inference(#[from] ModelError),
  #[error("Detection task aborted: {0}")]
  Join(#[from] JoinError),
}

impl From<RegistryError> for TaskError {
  fn from(err: RegistryError) -> Self {
    match err {
      RegistryError::InvalidSelector(e) => TaskError::InvalidSelector(e),
      RegistryError::Load { selector, source } => TaskError::ModelLoad { selector, source },
      RegistryError::Join(e) => TaskError::Join(e),
    }
  }
}

impl TaskError {
  /// 由调用方输入导致的错误
  pub fn is_client_error(&self) -> bool {
    matches!(self, TaskError::Decode(_) | TaskError::InvalidSelector(_))
  }
}

/// 单次请求的检测流程：解码、选择模型、推理、规范化、渲染，严格串行。
pub struct DetectTask {
  registry: ModelRegistry,
  render: Option<Arc<dyn Render>>,
}

impl DetectTask {
  pub fn new(registry: ModelRegistry) -> Self {
    DetectTask {
      registry,
      render: None,
    }
  }

  pub fn with_render(mut self, render: Arc<dyn Render>) -> Self {
    self.render = Some(render);
    self
  }

  pub fn registry(&self) -> &ModelRegistry {
    &self.registry
  }

  pub async fn run_str<B>(&self, image: B, selector: &str) -> Result<InferenceResult, TaskError>
  where
    B: AsRef<[u8]> + Send + 'static,
  {
    let selector: ModelSelector = selector.parse()?;
    self.run(image, selector).await
  }

  pub async fn run<B>(&self, image: B, selector: ModelSelector) -> Result<InferenceResult, TaskError>
  where
    B: AsRef<[u8]> + Send + 'static,
  {
    // 先解码：坏图像不应触发模型加载
    let frame = tokio::task::spawn_blocking(move || decode_image(image.as_ref())).await??;
    let model = self.registry.resolve(selector).await?;
    let render = self.render.clone();

    info!(
      "开始推理: {} 档, 图像 {}x{}",
      selector,
      frame.width(),
      frame.height()
    );
    let result = tokio::task::spawn_blocking(move || detect(model, &frame, render)).await??;
    info!(
      "推理完成: {} 个物体, 耗时 {:.1}/{:.1}/{:.1} ms",
      result.detected_objects.len(),
      result.speed.preprocess,
      result.speed.inference,
      result.speed.postprocess
    );

    Ok(result)
  }
}

fn detect(
  model: Arc<dyn Model>,
  frame: &BgrFrame,
  render: Option<Arc<dyn Render>>,
) -> Result<InferenceResult, ModelError> {
  let raw = model.infer(frame)?;
  let mut result = normalize(&raw, model.labels());

  if let Some(render) = render {
    match render.render_result(frame, &raw, model.labels()) {
      Ok(path) => {
        debug!("渲染结果已写入: {}", path.display());
        result.inferred_image_path = Some(path.to_string_lossy().into_owned());
      }
      // 渲染失败不影响检测结果
      Err(e) => warn!("渲染检测结果失败: {}", e),
    }
  }

  Ok(result)
}
