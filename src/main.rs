// 该文件是 Shibie （识别） 项目的一部分。
// src/main.rs - 检测服务主程序
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

use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::{info, warn};

use shibie::{
  args::{Args, log_filter},
  model::ModelSelector,
  server::create_app,
};

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(log_filter())
    .init();

  let args = Args::parse();

  info!("Shibie 目标检测服务");
  for selector in ModelSelector::ALL {
    info!(
      "{} 档模型: {}",
      selector,
      args.model.model_paths().path(selector).display()
    );
  }
  info!("渲染输出: {}", args.model.render_path.display());
  info!("静态资源目录: {}", args.static_dir.display());

  let task = Arc::new(args.model.build_task().context("初始化渲染输出失败")?);

  if args.preload {
    info!("预加载全部模型...");
    task.registry().preload().await.context("预加载模型失败")?;
  }

  let app = create_app(Arc::clone(&task), &args.app_options())
    .with_context(|| format!("无效的 CORS 来源: {}", args.cors_origin))?;

  let addr = args.bind_addr();
  let listener = TcpListener::bind(&addr)
    .await
    .with_context(|| format!("无法监听 {addr}"))?;
  info!("服务已启动: http://{}", addr);

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("服务异常退出")?;

  info!("服务已停止");
  Ok(())
}

async fn shutdown_signal() {
  match tokio::signal::ctrl_c().await {
    Ok(()) => info!("收到退出信号，正在关闭服务..."),
    Err(e) => {
      // 无法注册信号处理时一直运行
      warn!("无法监听退出信号: {}", e);
      std::future::pending::<()>().await;
    }
  }
}
