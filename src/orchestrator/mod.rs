//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责一次请求内的批量调度，是整个系统的"指挥中心"。
//!
//! ## 层次关系
//!
//! ```text
//! api (HTTP 上传 / 响应 / 清理)
//!     ↓
//! batch_processor (处理 Vec<UploadedImage>)
//!     ↓
//! workflow::ExtractionFlow (处理单张图片)
//!     ↓
//! services (能力层：字段提取 / 模型调用 / 表格生成)
//! ```
//!
//! ## 设计原则
//!
//! 1. **向下依赖**：编排层 → workflow → services
//! 2. **无业务逻辑**：只做调度、过滤和统计，不解析模型输出

pub mod batch_processor;

pub use batch_processor::BatchProcessor;
