use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::api::{self, AppState};
use crate::config::Config;
use crate::orchestrator::BatchProcessor;
use crate::services::{FieldExtractor, LlmService, VisionModel};
use crate::utils::logging;

/// 应用主结构
pub struct App {
    config: Arc<Config>,
    state: AppState,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::log_startup(&config);

        // 确保上传目录存在
        tokio::fs::create_dir_all(&config.upload_dir)
            .await
            .with_context(|| format!("无法创建上传目录: {}", config.upload_dir.display()))?;

        let model: Arc<dyn VisionModel> = Arc::new(LlmService::new(&config)?);
        Self::with_model(config, model)
    }

    /// 使用指定的模型初始化（测试中注入模拟模型）
    pub fn with_model(config: Config, model: Arc<dyn VisionModel>) -> Result<Self> {
        let config = Arc::new(config);
        let extractor = Arc::new(FieldExtractor::new(model)?);
        let processor = BatchProcessor::new(extractor, &config);

        Ok(Self {
            state: AppState::new(processor, config.clone()),
            config,
        })
    }

    /// 路由（不监听端口）
    pub fn router(&self) -> axum::Router {
        api::build_router(self.state.clone())
    }

    /// 运行应用主逻辑
    pub async fn run(self) -> Result<()> {
        info!("📡 正在启动 HTTP 服务...");
        api::serve(self.router(), &self.config.bind_addr).await
    }
}
