//! HTTP 错误响应
//!
//! 所有错误都以 `{ "error": string }` 的形式返回

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use crate::error::{AppError, ValidationError};

/// 错误响应体
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// 接口层错误，带 HTTP 状态码映射
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// 用户可修正的请求错误
    #[error("{0}")]
    BadRequest(String),
    /// 请求体超过上限
    #[error("Upload is too large.")]
    PayloadTooLarge,
    /// 所有图片都提取失败
    #[error("Failed to extract data from any of the images.")]
    ExtractionFailed,
    /// 其他内部错误（细节只写日志）
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::ExtractionFailed | ApiError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = match &self {
            ApiError::Internal(detail) => {
                error!("❌ 处理请求时发生内部错误: {}", detail);
                "An internal server error occurred.".to_string()
            }
            other => other.to_string(),
        };

        (self.status(), Json(ErrorBody { error: message })).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Validation(e) => e.into(),
            AppError::TotalExtractionFailure { .. } => ApiError::ExtractionFailed,
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}
