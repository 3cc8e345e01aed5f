//! 批量图片处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块负责一次请求中所有图片的调度和结果汇总。
//!
//! ## 核心功能
//!
//! 1. **请求校验**：字段列表和图片列表都不能为空
//! 2. **并发提取**：每张图片一个任务，同时发出，用 Semaphore 限制同时在途的模型调用
//! 3. **全部等待**：等所有任务结束（不是遇错即停）
//! 4. **过滤汇总**：丢弃失败的图片，按提交顺序保留成功记录
//! 5. **生成表格**：交给表格服务生成 xlsx
//!
//! ## 设计特点
//!
//! - **无状态**：每次请求独立处理，不在请求之间共享数据
//! - **不取消**：任务一旦发出，就会执行到结束
//! - **向下委托**：单张图片的细节交给 `workflow::ExtractionFlow`

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult, ExtractionError, ValidationError};
use crate::models::{
    BatchReport, ExtractionRecord, ExtractionRequest, ImageCtx, SpreadsheetDocument,
};
use crate::services::{spreadsheet, FieldExtractor};
use crate::utils::logging;
use crate::workflow::ExtractionFlow;

/// 批量处理器
#[derive(Clone)]
pub struct BatchProcessor {
    flow: ExtractionFlow,
    max_concurrent: usize,
}

impl BatchProcessor {
    /// 创建批量处理器
    pub fn new(extractor: Arc<FieldExtractor>, config: &Config) -> Self {
        Self {
            flow: ExtractionFlow::new(extractor, config.max_retries),
            max_concurrent: config.max_concurrent_extractions.max(1),
        }
    }

    /// 处理一次提取请求
    ///
    /// # 返回
    /// - 成功：表格文件和诊断信息
    /// - `AppError::Validation`：字段或图片为空（不会调用模型）
    /// - `AppError::TotalExtractionFailure`：所有图片都提取失败
    pub async fn process(
        &self,
        request: ExtractionRequest,
    ) -> AppResult<(SpreadsheetDocument, BatchReport)> {
        if request.images.is_empty() {
            return Err(ValidationError::NoImages.into());
        }
        if request.fields.is_empty() {
            return Err(ValidationError::NoFields.into());
        }

        let total = request.images.len();
        logging::log_batch_start(total, &request.fields.joined());

        let outcomes = self.extract_all(&request).await;

        let mut report = BatchReport {
            submitted: total,
            ..Default::default()
        };
        let mut records = Vec::with_capacity(total);

        for (image, outcome) in request.images.iter().zip(outcomes) {
            match outcome {
                Ok(record) => records.push(record),
                Err(_) => report.failed.push(image.file_name.clone()),
            }
        }
        report.succeeded = records.len();

        logging::log_batch_complete(&report);

        if records.is_empty() {
            error!("❌ 所有图片都提取失败 (共 {} 张)", total);
            return Err(AppError::TotalExtractionFailure { attempted: total });
        }

        let bytes = spreadsheet::build(&records)?;
        let document = SpreadsheetDocument::new(bytes, records.len());

        info!(
            "📊 表格已生成: {} ({} 行, {} 字节)",
            document.file_name,
            document.rows,
            document.bytes.len()
        );

        Ok((document, report))
    }

    /// 并发处理所有图片，结果与提交顺序一一对应
    async fn extract_all(
        &self,
        request: &ExtractionRequest,
    ) -> Vec<Result<ExtractionRecord, ExtractionError>> {
        let total = request.images.len();
        let fields = Arc::new(request.fields.clone());
        let mut handles = Vec::with_capacity(total);

        // 每次请求独立的并发上限，不与其他请求共享
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));

        // 所有任务立即发出，由 Semaphore 控制同时在途的数量
        for (idx, image) in request.images.iter().enumerate() {
            let ctx = ImageCtx::new(idx + 1, total, image.file_name.clone());
            let flow = self.flow.clone();
            let semaphore = semaphore.clone();
            let fields = fields.clone();
            let image = image.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.map_err(|e| {
                    ExtractionError::Model(anyhow::anyhow!("并发控制已关闭: {}", e))
                })?;
                flow.run(&image, &fields, &ctx).await
            }));
        }

        // 等待所有任务完成
        let joined = futures::future::join_all(handles).await;

        joined
            .into_iter()
            .enumerate()
            .map(|(idx, result)| match result {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!("[图片 {}/{}] 任务执行失败: {}", idx + 1, total, e);
                    Err(ExtractionError::Model(anyhow::anyhow!("任务执行失败: {}", e)))
                }
            })
            .collect()
    }
}
