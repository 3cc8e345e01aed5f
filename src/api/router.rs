//! HTTP 路由与服务启动

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::api::handlers;
use crate::config::Config;
use crate::orchestrator::BatchProcessor;

/// 所有路由共享的状态
#[derive(Clone)]
pub struct AppState {
    pub processor: BatchProcessor,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(processor: BatchProcessor, config: Arc<Config>) -> Self {
        Self { processor, config }
    }
}

/// 构建路由
///
/// - `POST /process-bills`：上传图片，返回 xlsx
/// - `GET /health`：存活探针
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_body_bytes;

    Router::new()
        .route("/process-bills", post(handlers::process_bills))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// 启动 HTTP 服务，收到退出信号后优雅关闭
pub async fn serve(router: Router, bind_addr: &str) -> Result<()> {
    let listener = TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("无法监听地址: {}", bind_addr))?;

    info!("🚀 服务已启动: http://{}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("👋 服务已关闭");
    Ok(())
}

/// 等待 Ctrl+C 或 SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("无法监听 Ctrl+C 信号: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("无法监听 SIGTERM 信号: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("收到退出信号，正在关闭服务...");
}
