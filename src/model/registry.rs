// 该文件是 Shibie （识别） 项目的一部分。
// src/model/registry.rs - 模型注册表
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
  sync::Arc,
  time::Instant,
};

use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::model::{InvalidModelSelector, Model, ModelError, ModelSelector};

/// 从权重文件构建模型，在阻塞线程池上调用
pub trait ModelLoader: Send + Sync {
  fn load(&self, selector: ModelSelector, path: &Path) -> Result<Arc<dyn Model>, ModelError>;
}

#[derive(Error, Debug)]
pub enum RegistryError {
  #[error(transparent)]
  InvalidSelector(#[from] InvalidModelSelector),
  #[error("模型 {selector} 加载失败: {source}")]
  Load {
    selector: ModelSelector,
    #[source]
    source: ModelError,
  },
  #[error("模型加载任务异常退出: {0}")]
  Join(#[from] tokio::task::JoinError),
}

/// 档位到权重路径的映射表
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPaths {
  paths: [PathBuf; 2],
}

impl ModelPaths {
  pub fn new(fast: impl Into<PathBuf>, accurate: impl Into<PathBuf>) -> Self {
    ModelPaths {
      paths: [fast.into(), accurate.into()],
    }
  }

  pub fn path(&self, selector: ModelSelector) -> &Path {
    &self.paths[selector.index()]
  }
}

impl Default for ModelPaths {
  fn default() -> Self {
    ModelPaths::new(
      ModelSelector::Fast.default_weights(),
      ModelSelector::Accurate.default_weights(),
    )
  }
}

/// 进程内的模型缓存。
///
/// 每个档位一个 `OnceCell`：首次成功加载的模型被所有请求复用，
/// 并发的首次请求等待同一次加载；加载失败不缓存，下一次请求会重试。
pub struct ModelRegistry {
  paths: ModelPaths,
  loader: Arc<dyn ModelLoader>,
  slots: [OnceCell<Arc<dyn Model>>; 2],
}

impl ModelRegistry {
  pub fn new(paths: ModelPaths, loader: Arc<dyn ModelLoader>) -> Self {
    ModelRegistry {
      paths,
      loader,
      slots: [OnceCell::new(), OnceCell::new()],
    }
  }

  pub fn paths(&self) -> &ModelPaths {
    &self.paths
  }

  pub fn is_loaded(&self, selector: ModelSelector) -> bool {
    self.slots[selector.index()].initialized()
  }

  pub async fn resolve(&self, selector: ModelSelector) -> Result<Arc<dyn Model>, RegistryError> {
    let model = self.slots[selector.index()]
      .get_or_try_init(|| self.load(selector))
      .await?;
    Ok(Arc::clone(model))
  }

  pub async fn resolve_str(&self, selector: &str) -> Result<Arc<dyn Model>, RegistryError> {
    let selector: ModelSelector = selector.parse()?;
    self.resolve(selector).await
  }

  /// 启动时预热全部档位
  pub async fn preload(&self) -> Result<(), RegistryError> {
    for selector in ModelSelector::ALL {
      self.resolve(selector).await?;
    }
    Ok(())
  }

  async fn load(&self, selector: ModelSelector) -> Result<Arc<dyn Model>, RegistryError> {
    let path = self.paths.path(selector).to_path_buf();
    let loader = Arc::clone(&self.loader);
    info!("加载 {} 档模型: {}", selector, path.display());

    let now = Instant::now();
    let result = tokio::task::spawn_blocking(move || loader.load(selector, &path)).await?;
    match result {
      Ok(model) => {
        info!("{} 档模型加载完成，耗时: {:.2?}", selector, now.elapsed());
        Ok(model)
      }
      Err(source) => {
        warn!("{} 档模型加载失败: {}", selector, source);
        Err(RegistryError::Load { selector, source })
      }
    }
  }
}
