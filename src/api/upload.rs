//! multipart 上传的接收与暂存
//!
//! 每张图片写入上传目录中的唯一临时文件。临时文件由 `TempPath` 持有，
//! 无论请求成功、失败还是中途被丢弃，离开作用域时都会被删除。

use std::path::Path;

use axum::extract::multipart::{Multipart, MultipartError};
use axum::http::StatusCode;
use tempfile::TempPath;
use tracing::{debug, error};

use crate::api::error::ApiError;
use crate::config::Config;
use crate::error::ValidationError;
use crate::models::{extension_for, resolve_mime_type, UploadedImage};

/// 字段列表的表单字段名
pub const FIELDS_FIELD: &str = "fields";
/// 图片的表单字段名
pub const PHOTOS_FIELD: &str = "photos";

/// 一张已暂存的图片
struct StagedUpload {
    image: UploadedImage,
    temp: TempPath,
}

/// 一次请求上传的全部内容
#[derive(Default)]
pub struct UploadBatch {
    fields: Option<String>,
    uploads: Vec<StagedUpload>,
}

impl UploadBatch {
    /// 读取 multipart 请求体并暂存所有图片
    ///
    /// 出错时已暂存的文件随 `UploadBatch` 一起被删除
    pub async fn receive(multipart: &mut Multipart, config: &Config) -> Result<Self, ApiError> {
        let mut batch = UploadBatch::default();

        while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
            let name = field.name().map(str::to_string);

            match name.as_deref() {
                Some(FIELDS_FIELD) => {
                    let text = field.text().await.map_err(multipart_error)?;
                    batch.fields = Some(text);
                }
                Some(PHOTOS_FIELD) => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let content_type = field.content_type().map(str::to_string);
                    let data = field.bytes().await.map_err(multipart_error)?;

                    // 浏览器在未选择文件时会发送一个空的文件字段
                    if file_name.is_empty() && data.is_empty() {
                        debug!("跳过空的图片字段");
                        continue;
                    }

                    if batch.uploads.len() >= config.max_images_per_request {
                        return Err(ValidationError::TooManyImages {
                            max: config.max_images_per_request,
                        }
                        .into());
                    }

                    let mime_type = resolve_mime_type(&file_name, content_type.as_deref())
                        .ok_or_else(|| ValidationError::UnsupportedImage {
                            file_name: file_name.clone(),
                        })?;

                    let temp = stage_file(&config.upload_dir, mime_type, &data).await?;
                    debug!(
                        "已暂存图片 {} -> {} ({} 字节)",
                        file_name,
                        temp.display(),
                        data.len()
                    );

                    batch.uploads.push(StagedUpload {
                        image: UploadedImage::new(file_name, mime_type, temp.to_path_buf()),
                        temp,
                    });
                }
                other => {
                    debug!("忽略未知表单字段: {:?}", other);
                }
            }
        }

        Ok(batch)
    }

    /// 原始字段字符串
    pub fn fields(&self) -> Option<&str> {
        self.fields.as_deref()
    }

    /// 已暂存的图片（按上传顺序）
    pub fn images(&self) -> Vec<UploadedImage> {
        self.uploads.iter().map(|u| u.image.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.uploads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uploads.is_empty()
    }

    /// 删除所有暂存文件，失败只记录日志
    pub fn cleanup(self) {
        for staged in self.uploads {
            let path = staged.temp.to_path_buf();
            if let Err(e) = staged.temp.close() {
                error!("删除暂存文件失败 {}: {}", path.display(), e);
            }
        }
    }
}

/// 把图片写入上传目录中的唯一临时文件
async fn stage_file(dir: &Path, mime_type: &str, data: &[u8]) -> std::io::Result<TempPath> {
    tokio::fs::create_dir_all(dir).await?;

    let suffix = format!(".{}", extension_for(mime_type));
    let temp = tempfile::Builder::new()
        .prefix("photos-")
        .suffix(&suffix)
        .tempfile_in(dir)?
        .into_temp_path();

    tokio::fs::write(&temp, data).await?;
    Ok(temp)
}

fn multipart_error(err: MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge
    } else {
        ValidationError::Multipart(err.body_text()).into()
    }
}
