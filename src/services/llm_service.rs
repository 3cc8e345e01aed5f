//! LLM 服务 - 业务能力层
//!
//! 只负责"看图回答"能力，不关心流程
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 支持自定义 API 端点和模型
//! - 兼容 OpenAI API 的服务（如 Gemini 的 OpenAI 兼容端点、Azure 等）

use std::time::Duration;

use anyhow::Result;
use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImage,
        ChatCompletionRequestMessageContentPartText,
        ChatCompletionRequestUserMessageArgs, ChatCompletionRequestUserMessageContent,
        ChatCompletionRequestUserMessageContentPart, CreateChatCompletionRequestArgs, ImageDetail,
        ImageUrl,
    },
    Client,
};
use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::Config;

/// 多模态模型能力
///
/// 输入一段指令和一张图片（data URL），返回模型的原始文本输出。
/// 输出是不可信的自由文本，调用方负责解析。
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// 模型名称（仅用于日志）
    fn model_name(&self) -> &str;

    /// 发送指令和图片，返回模型的文本回复
    async fn analyze_image(&self, instruction: &str, image_data_url: &str) -> Result<String>;
}

/// LLM 服务
///
/// 职责：
/// - 调用 OpenAI 兼容的 chat completions 接口
/// - 只处理单张图片
/// - 不关心字段列表、批次和表格
pub struct LlmService {
    client: Client<OpenAIConfig>,
    model_name: String,
}

impl LlmService {
    /// 采样温度，提取任务尽量保持输出稳定
    const TEMPERATURE: f32 = 0.0;
    /// 单次回复的最大 token 数
    const MAX_TOKENS: u32 = 1024;

    /// 创建新的 LLM 服务
    pub fn new(config: &Config) -> Result<Self> {
        // 配置 OpenAI 客户端（兼容 OpenAI API 的服务）
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        let client = Client::with_config(openai_config).with_http_client(http_client);

        Ok(Self {
            client,
            model_name: config.llm_model_name.clone(),
        })
    }

    /// 发送一条带图片的用户消息
    ///
    /// # 参数
    /// - `instruction`: 提取指令
    /// - `image_data_url`: 图片（`data:` URL）
    ///
    /// # 返回
    /// 返回 LLM 的响应内容（字符串）
    pub async fn send_to_llm(&self, instruction: &str, image_data_url: &str) -> Result<String> {
        debug!("调用 LLM API，模型: {}", self.model_name);
        debug!("指令长度: {} 字符", instruction.len());

        let content_parts = vec![
            ChatCompletionRequestUserMessageContentPart::Text(
                ChatCompletionRequestMessageContentPartText {
                    text: instruction.to_string(),
                },
            ),
            ChatCompletionRequestUserMessageContentPart::ImageUrl(
                ChatCompletionRequestMessageContentPartImage {
                    image_url: ImageUrl {
                        url: image_data_url.to_string(),
                        detail: Some(ImageDetail::High),
                    },
                },
            ),
        ];

        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(ChatCompletionRequestUserMessageContent::Array(content_parts))
            .build()?;

        let messages = vec![ChatCompletionRequestMessage::User(user_msg)];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(messages)
            .temperature(Self::TEMPERATURE)
            .max_tokens(Self::MAX_TOKENS)
            .build()?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            warn!("LLM API 调用失败: {}", e);
            anyhow::anyhow!("LLM API 调用失败: {}", e)
        })?;

        debug!("LLM API 调用成功");

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| anyhow::anyhow!("LLM 返回内容为空"))?;

        Ok(content.trim().to_string())
    }
}

#[async_trait]
impl VisionModel for LlmService {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn analyze_image(&self, instruction: &str, image_data_url: &str) -> Result<String> {
        self.send_to_llm(instruction, image_data_url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_config() -> Config {
        Config {
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or_else(|_| "test-key".to_string()),
            ..Config::default()
        }
    }

    #[test]
    fn test_service_uses_configured_model() {
        let config = Config {
            llm_model_name: "gemini-2.0-flash".to_string(),
            ..create_test_config()
        };
        let service = LlmService::new(&config).unwrap();
        assert_eq!(service.model_name(), "gemini-2.0-flash");
    }

    /// 测试 Vision API 图片理解能力
    ///
    /// 运行方式：
    /// ```bash
    /// LLM_API_KEY=... cargo test test_vision_api -- --ignored --nocapture
    /// ```
    #[tokio::test]
    #[ignore]
    async fn test_vision_api() {
        let _ = tracing_subscriber::fmt::try_init();

        let service = LlmService::new(&create_test_config()).unwrap();

        // 1x1 白色 PNG
        let data_url = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8/5+hHgAHggJ/PchI7wAAAABJRU5ErkJggg==";

        let result = service
            .analyze_image("请用一句话描述这张图片的颜色。", data_url)
            .await;

        match result {
            Ok(response) => {
                println!("\n========== LLM 响应 ==========");
                println!("{}", response);
                println!("==============================\n");
                assert!(!response.is_empty());
            }
            Err(e) => panic!("Vision API 测试失败: {}", e),
        }
    }
}
