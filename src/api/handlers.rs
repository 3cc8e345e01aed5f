//! HTTP 接口处理函数

use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::State;
use axum::http::{header, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::info;

use crate::api::error::ApiError;
use crate::api::router::AppState;
use crate::api::upload::UploadBatch;
use crate::error::ValidationError;
use crate::models::{BatchReport, ExtractionRequest, FieldList, SpreadsheetDocument};

/// 成功提取的图片数量
pub const IMAGES_PROCESSED_HEADER: HeaderName =
    HeaderName::from_static("x-autotally-images-processed");
/// 提取失败的图片数量
pub const IMAGES_FAILED_HEADER: HeaderName = HeaderName::from_static("x-autotally-images-failed");

/// 提交票据图片进行处理
///
/// Form data:
/// - `fields`: 逗号分隔的字段名
/// - `photos`: 一张或多张图片
pub async fn process_bills(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    let mut multipart = multipart.map_err(|rejection| {
        ApiError::from(ValidationError::Multipart(rejection.body_text()))
    })?;

    let batch = UploadBatch::receive(&mut multipart, &state.config).await?;

    let outcome = extract(&state, &batch).await;

    // 无论成功失败都清理暂存文件
    batch.cleanup();

    let (document, report) = outcome?;
    Ok(spreadsheet_response(document, &report))
}

/// 存活探针
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn extract(
    state: &AppState,
    batch: &UploadBatch,
) -> Result<(SpreadsheetDocument, BatchReport), ApiError> {
    if batch.is_empty() {
        return Err(ValidationError::NoImages.into());
    }

    let fields = FieldList::parse(batch.fields().unwrap_or_default())?;

    info!(
        "📥 收到 {} 张图片，待提取字段: {}",
        batch.len(),
        fields.joined()
    );

    let request = ExtractionRequest::new(fields, batch.images())?;
    let result = state.processor.process(request).await?;
    Ok(result)
}

fn spreadsheet_response(document: SpreadsheetDocument, report: &BatchReport) -> Response {
    let disposition = format!("attachment; filename=\"{}\"", document.file_name);

    (
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                SpreadsheetDocument::CONTENT_TYPE.to_string(),
            ),
            (header::CONTENT_DISPOSITION, disposition),
            (IMAGES_PROCESSED_HEADER, report.succeeded.to_string()),
            (IMAGES_FAILED_HEADER, report.failed.len().to_string()),
        ],
        document.bytes,
    )
        .into_response()
}
