// 该文件是 Shibie （识别） 项目的一部分。
// src/server.rs - HTTP 接口
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

use axum::{
  Json, Router,
  extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartError},
  http::{
    HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
    header::{CONTENT_TYPE, InvalidHeaderValue},
  },
  response::{IntoResponse, Response},
  routing::{get, post},
};
use serde_json::json;
use thiserror::Error;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing::{debug, error, info, warn};

use crate::{result::InferenceResult, task::{DetectTask, TaskError}};

pub const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];
pub const INFERRED_IMAGE_PATH_HEADER: HeaderName = HeaderName::from_static("x-inferred-image-path");
pub const INFERENCE_SPEED_HEADER: HeaderName = HeaderName::from_static("x-inference-speed");

const NO_OBJECTS_MESSAGE: &str = "No objects detected";

#[derive(Error, Debug)]
pub enum ApiError {
  #[error("No image file provided")]
  MissingFile,
  #[error("No file name provided.")]
  MissingFileName,
  #[error("Invalid file type. Allowed types: jpg, jpeg, png.")]
  InvalidFileType,
  #[error("No model type provided. Available options: [fast, accurate].")]
  MissingModelType,
  #[error("Invalid multipart request: {0}")]
  Multipart(#[from] MultipartError),
  #[error(transparent)]
  Task(#[from] TaskError),
}

impl ApiError {
  pub fn status(&self) -> StatusCode {
    match self {
      ApiError::Multipart(e) => e.status(),
      ApiError::Task(e) if !e.is_client_error() => StatusCode::INTERNAL_SERVER_ERROR,
      _ => StatusCode::BAD_REQUEST,
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      error!("请求处理失败: {}", self);
    } else {
      warn!("拒绝请求: {}", self);
    }
    (status, Json(json!({ "error": self.to_string() }))).into_response()
  }
}

#[derive(Debug, Clone)]
pub struct AppOptions {
  pub cors_origin: String,
  pub static_dir: PathBuf,
  pub max_upload_bytes: usize,
}

impl Default for AppOptions {
  fn default() -> Self {
    AppOptions {
      cors_origin: "http://localhost:8501".to_string(),
      static_dir: PathBuf::from("static"),
      max_upload_bytes: 10 * 1024 * 1024,
    }
  }
}

#[derive(Clone)]
pub struct AppState {
  pub task: Arc<DetectTask>,
}

pub fn create_app(task: Arc<DetectTask>, options: &AppOptions) -> Result<Router, InvalidHeaderValue> {
  let cors = CorsLayer::new()
    .allow_origin(HeaderValue::from_str(&options.cors_origin)?)
    .allow_credentials(true)
    .allow_methods([Method::POST])
    .allow_headers([HeaderName::from_static("x-requested-with"), CONTENT_TYPE]);

  let app = Router::new()
    .route("/detect/", post(detect_handler))
    .route("/detect", post(detect_handler))
    .route("/health", get(health_handler))
    .nest_service("/static", ServeDir::new(&options.static_dir))
    .layer(DefaultBodyLimit::max(options.max_upload_bytes))
    .layer(cors)
    .layer(TraceLayer::new_for_http())
    .with_state(AppState { task });

  Ok(app)
}

/// 只看扩展名，内容是否真的是图像由解码器判断
pub fn validate_file_name(file_name: &str) -> Result<(), ApiError> {
  if file_name.is_empty() {
    return Err(ApiError::MissingFileName);
  }

  let lower = file_name.to_lowercase();
  let allowed = ALLOWED_EXTENSIONS
    .iter()
    .any(|ext| lower.ends_with(&format!(".{ext}")));
  if allowed {
    Ok(())
  } else {
    Err(ApiError::InvalidFileType)
  }
}

async fn health_handler() -> impl IntoResponse {
  Json(json!({ "status": "ok" }))
}

/// POST /detect/ - 上传图像并检测物体
///
/// 表单字段：`file`（jpg/jpeg/png）与 `type_model`（fast/accurate）。
/// 成功时返回检测目标数组，没有目标时返回 `{"message": "No objects detected"}`。
async fn detect_handler(
  State(state): State<AppState>,
  mut multipart: Multipart,
) -> Result<Response, ApiError> {
  let mut upload = None;
  let mut type_model = None;

  while let Some(field) = multipart.next_field().await? {
    let name = field.name().map(str::to_owned);
    match name.as_deref() {
      Some("file") => {
        let file_name = field.file_name().unwrap_or_default().to_owned();
        // 扩展名不合法时不读取文件内容
        validate_file_name(&file_name)?;
        let bytes = field.bytes().await?;
        debug!("收到文件: {}, {} 字节", file_name, bytes.len());
        upload = Some(bytes);
      }
      Some("type_model") => type_model = Some(field.text().await?),
      other => debug!("忽略表单字段: {:?}", other),
    }
  }

  let upload = upload.ok_or(ApiError::MissingFile)?;
  let type_model = type_model.ok_or(ApiError::MissingModelType)?;

  // 档位必须与 fast/accurate 完全一致
  let result = state.task.run_str(upload, &type_model).await?;
  info!(
    "检测请求完成: {} 档, {} 个物体",
    type_model,
    result.detected_objects.len()
  );

  Ok(detection_response(result))
}

fn detection_response(result: InferenceResult) -> Response {
  let mut headers = HeaderMap::new();
  if let Some(path) = &result.inferred_image_path
    && let Ok(value) = HeaderValue::from_str(path)
  {
    headers.insert(INFERRED_IMAGE_PATH_HEADER, value);
  }
  if let Ok(speed) = serde_json::to_string(&result.speed)
    && let Ok(value) = HeaderValue::from_str(&speed)
  {
    headers.insert(INFERENCE_SPEED_HEADER, value);
  }

  if result.detected_objects.is_empty() {
    (
      StatusCode::OK,
      headers,
      Json(json!({ "message": NO_OBJECTS_MESSAGE })),
    )
      .into_response()
  } else {
    (StatusCode::OK, headers, Json(result.detected_objects)).into_response()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn accepts_allowed_extensions_case_insensitively() {
    for name in ["a.jpg", "b.JPEG", "c.Png", "dir.v2.jpeg"] {
      assert!(validate_file_name(name).is_ok(), "{name}");
    }
  }

  #[test]
  fn rejects_other_extensions() {
    for name in ["a.gif", "jpg", "a.jpg.exe", "a.webp", "png"] {
      let err = validate_file_name(name).unwrap_err();
      assert!(matches!(err, ApiError::InvalidFileType), "{name}");
      assert!(err.to_string().contains("jpg, jpeg, png"));
    }
  }

  #[test]
  fn empty_file_name_is_missing() {
    assert!(matches!(
      validate_file_name(""),
      Err(ApiError::MissingFileName)
    ));
  }

  #[test]
  fn statuses_split_client_and_server_errors() {
    use crate::{input::DecodeError, model::{ModelError, ModelSelector}};

    assert_eq!(ApiError::InvalidFileType.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
      ApiError::Task(TaskError::Decode(DecodeError::Empty)).status(),
      StatusCode::BAD_REQUEST
    );
    assert_eq!(
      ApiError::Task(TaskError::ModelLoad {
        selector: ModelSelector::Fast,
        source: ModelError::Load("corrupt".to_string()),
      })
      .status(),
      StatusCode::INTERNAL_SERVER_ERROR
    );
  }
}
