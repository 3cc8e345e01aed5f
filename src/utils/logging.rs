/// 日志工具模块
///
/// 提供日志初始化、格式化和输出的辅助函数
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::models::BatchReport;

/// 初始化全局日志
///
/// `RUST_LOG` 优先；未设置时默认 `info`，开启详细日志时为 `debug`。
/// 重复调用不会报错（测试中会多次初始化）。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 AutoTally 启动 - 票据字段提取服务");
    info!("🌐 监听地址: {}", config.bind_addr);
    info!("🤖 模型: {} ({})", config.llm_model_name, config.llm_api_base_url);
    info!("📁 上传目录: {}", config.upload_dir.display());
    info!(
        "📊 单次最多 {} 张图片，最大并发数: {}",
        config.max_images_per_request, config.max_concurrent_extractions
    );
    info!("{}", "=".repeat(60));
}

/// 记录批次开始信息
///
/// # 参数
/// - `total`: 图片总数
/// - `fields`: 待提取字段
pub fn log_batch_start(total: usize, fields: &str) {
    info!("{}", "─".repeat(60));
    info!("📦 开始处理 {} 张图片，字段: {}", total, fields);
}

/// 记录批次完成信息
pub fn log_batch_complete(report: &BatchReport) {
    info!(
        "✓ 批次完成: 成功 {}/{}",
        report.succeeded, report.submitted
    );
    if !report.failed.is_empty() {
        warn!("❌ 提取失败的图片: {}", report.failed.join(", "));
    }
    info!("{}", "─".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度（字符数）
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("hello", 10), "hello");
        assert_eq!(truncate_text("hello world", 5), "hello...");
        assert_eq!(truncate_text("收据金额合计", 2), "收据...");
    }
}
