//! # AutoTally
//!
//! 上传票据照片，按用户指定的字段调用多模态模型提取数据，汇总为 xlsx 表格下载。
//!
//! ## 架构设计
//!
//! 本系统采用四层架构：
//!
//! ### ① 传输层（Api）
//! - `api/` - HTTP 上传、暂存文件、返回表格、清理暂存文件
//!
//! ### ② 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 校验请求，并发处理所有图片，过滤失败，生成表格
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一张图片"的完整处理流程（读取 → 提取 → 重试）
//!
//! ### ④ 业务能力层（Services）
//! - `LlmService` - 调用 OpenAI 兼容的多模态模型
//! - `FieldExtractor` - 构建提取指令，解析模型返回的 JSON
//! - `spreadsheet` - 生成 xlsx
//!
//! ## 模块结构

pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use app::App;
pub use config::Config;
pub use error::{AppError, AppResult, ExtractionError, ValidationError};
pub use models::{ExtractionRecord, ExtractionRequest, FieldList, SpreadsheetDocument, UploadedImage};
pub use orchestrator::BatchProcessor;
pub use services::{FieldExtractor, LlmService, VisionModel};
pub use workflow::ExtractionFlow;
