// 该文件是 Shibie （识别） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::{path::PathBuf, sync::Arc};

use clap::{Args as ClapArgs, Parser};
use tracing_subscriber::EnvFilter;

use crate::{
  model::{ModelPaths, ModelRegistry, OnnxLoader},
  output::{DEFAULT_RENDER_PATH, RenderError},
  server::AppOptions,
  task::DetectTask,
};

/// `RUST_LOG` 未设置时的日志级别
pub const DEFAULT_LOG_FILTER: &str = "info";

/// 日志过滤器，服务与命令行工具共用
pub fn log_filter() -> EnvFilter {
  EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// 模型与渲染相关参数，服务与命令行工具共用
#[derive(ClapArgs, Debug, Clone)]
pub struct ModelArgs {
  /// fast 档 YOLOv8 ONNX 权重路径
  #[arg(long, env = "FAST_MODEL", default_value = "models/yolov8n.onnx", value_name = "FILE")]
  pub fast_model: PathBuf,

  /// accurate 档 YOLOv8 ONNX 权重路径
  #[arg(
    long,
    env = "ACCURATE_MODEL",
    default_value = "models/yolov8x.onnx",
    value_name = "FILE"
  )]
  pub accurate_model: PathBuf,

  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, env = "CONFIDENCE", default_value_t = 0.25, value_name = "THRESHOLD")]
  pub confidence: f32,

  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, env = "NMS_THRESHOLD", default_value_t = 0.7, value_name = "THRESHOLD")]
  pub nms_threshold: f32,

  /// 渲染结果保存路径，每次请求覆盖
  #[arg(long, env = "RENDER_PATH", default_value = DEFAULT_RENDER_PATH, value_name = "OUTPUT")]
  pub render_path: PathBuf,

  /// 标签文字使用的 TTF 字体，不指定时使用内置字体
  #[arg(long, env = "FONT_PATH", value_name = "FILE")]
  pub font: Option<PathBuf>,
}

impl ModelArgs {
  pub fn model_paths(&self) -> ModelPaths {
    ModelPaths::new(&self.fast_model, &self.accurate_model)
  }

  pub fn build_task(&self) -> Result<DetectTask, RenderError> {
    let loader = Arc::new(OnnxLoader::new(self.confidence, self.nms_threshold));
    let task = DetectTask::new(ModelRegistry::new(self.model_paths(), loader));

    #[cfg(feature = "save_image_file")]
    let task = {
      use crate::output::{SaveImageFileOutput, draw::Draw};

      let draw = match &self.font {
        Some(font) => Draw::default().with_font(Draw::load_font(font)?),
        None => Draw::default(),
      };
      task.with_render(Arc::new(
        SaveImageFileOutput::new(&self.render_path).with_draw(draw),
      ))
    };

    #[cfg(not(feature = "save_image_file"))]
    tracing::warn!("未启用 save_image_file，不生成渲染结果");

    Ok(task)
  }
}

/// Shibie 服务参数配置
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 监听地址
  #[arg(long, env = "HOST", default_value = "0.0.0.0")]
  pub host: String,

  /// 监听端口
  #[arg(long, env = "PORT", default_value_t = 8000)]
  pub port: u16,

  /// 静态资源目录，挂载在 /static 下
  #[arg(long, env = "STATIC_DIR", default_value = "static", value_name = "DIR")]
  pub static_dir: PathBuf,

  /// 允许跨域访问的来源
  #[arg(long, env = "CORS_ORIGIN", default_value = "http://localhost:8501")]
  pub cors_origin: String,

  /// 上传文件大小上限（字节）
  #[arg(long, env = "MAX_UPLOAD_BYTES", default_value_t = 10 * 1024 * 1024)]
  pub max_upload_bytes: usize,

  /// 启动时加载全部模型
  #[arg(long, env = "PRELOAD")]
  pub preload: bool,

  #[command(flatten)]
  pub model: ModelArgs,
}

impl Args {
  pub fn bind_addr(&self) -> String {
    format!("{}:{}", self.host, self.port)
  }

  pub fn app_options(&self) -> AppOptions {
    AppOptions {
      cors_origin: self.cors_origin.clone(),
      static_dir: self.static_dir.clone(),
      max_upload_bytes: self.max_upload_bytes,
    }
  }
}
