//! 单张图片处理流程 - 流程层
//!
//! 核心职责：定义"一张图片"的完整处理流程
//!
//! 流程顺序：
//! 1. 读取暂存的图片文件
//! 2. 字段提取（失败时按配置重试）
//! 3. 记录结果日志

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::ExtractionError;
use crate::models::{ExtractionRecord, FieldList, ImageCtx, UploadedImage};
use crate::services::FieldExtractor;

/// 单张图片处理流程
///
/// - 只处理一张图片
/// - 不持有任何暂存文件（文件由传输层负责清理）
/// - 失败只记录日志，由编排层决定如何汇总
#[derive(Clone)]
pub struct ExtractionFlow {
    extractor: Arc<FieldExtractor>,
    max_retries: u32,
}

impl ExtractionFlow {
    /// 创建新的处理流程
    pub fn new(extractor: Arc<FieldExtractor>, max_retries: u32) -> Self {
        Self {
            extractor,
            max_retries,
        }
    }

    /// 处理一张图片
    ///
    /// 成功返回提取记录，失败返回最后一次的错误
    pub async fn run(
        &self,
        image: &UploadedImage,
        fields: &FieldList,
        ctx: &ImageCtx,
    ) -> Result<ExtractionRecord, ExtractionError> {
        let bytes = tokio::fs::read(&image.path)
            .await
            .map_err(|source| ExtractionError::Io {
                path: image.path.display().to_string(),
                source,
            })?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.extractor.extract(&bytes, image.mime_type, fields).await {
                Ok(record) => {
                    if record.is_empty() {
                        warn!("{} ⚠️ 模型返回了空对象，该行将没有数据", ctx);
                    }
                    info!("{} ✓ 提取成功，字段数: {}", ctx, record.len());
                    return Ok(record);
                }
                Err(e) if attempt <= self.max_retries => {
                    warn!(
                        "{} ⚠️ 第 {} 次提取失败，准备重试: {}",
                        ctx, attempt, e
                    );
                }
                Err(e) => {
                    warn!("{} ❌ 提取失败 (共尝试 {} 次): {}", ctx, attempt, e);
                    return Err(e);
                }
            }
        }
    }
}
