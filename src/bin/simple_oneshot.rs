// 该文件是 Shibie （识别） 项目的一部分。
// src/bin/simple_oneshot.rs - 单张图像推理工具
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

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use shibie::args::{ModelArgs, log_filter};

/// 对单张图像执行一次检测，结果以 JSON 打印到标准输出
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入图像（jpg/jpeg/png）
  #[arg(long, value_name = "SOURCE")]
  pub input: PathBuf,
  /// 模型档位：fast 或 accurate
  #[arg(long, default_value = "accurate", value_name = "TYPE")]
  pub type_model: String,
  #[command(flatten)]
  pub model: ModelArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(log_filter())
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  info!("输入图像: {}", args.input.display());
  info!("模型档位: {}", args.type_model);

  let image = std::fs::read(&args.input)
    .with_context(|| format!("无法读取 {}", args.input.display()))?;
  let task = args.model.build_task()?;

  info!("开始推理...");
  let now = std::time::Instant::now();
  let result = task.run_str(image, &args.type_model).await?;
  info!("推理完成，耗时: {:.2?}", now.elapsed());

  println!("{}", serde_json::to_string_pretty(&result)?);

  Ok(())
}
