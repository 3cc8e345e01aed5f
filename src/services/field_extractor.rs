//! 字段提取服务 - 业务能力层
//!
//! 只负责"从一张票据图片中提取指定字段"，不关心批次和表格

use std::sync::Arc;

use anyhow::Result;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use regex::Regex;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::ExtractionError;
use crate::models::{ExtractionRecord, FieldList};
use crate::services::llm_service::VisionModel;
use crate::utils::logging::truncate_text;

/// 字段提取服务
///
/// 职责：
/// - 构建提取指令
/// - 把图片编码为 base64 data URL 交给模型
/// - 清理并解析模型返回的 JSON
/// - 不重试，失败直接返回错误
pub struct FieldExtractor {
    model: Arc<dyn VisionModel>,
    fence: Regex,
}

impl FieldExtractor {
    /// 创建新的字段提取服务
    pub fn new(model: Arc<dyn VisionModel>) -> Result<Self> {
        Ok(Self {
            model,
            fence: Regex::new(r"(?i)```(?:json)?")?,
        })
    }

    /// 从一张图片中提取字段
    ///
    /// # 参数
    /// - `image_bytes`: 图片原始字节
    /// - `mime_type`: 图片 MIME 类型
    /// - `fields`: 待提取字段
    ///
    /// # 返回
    /// 成功时返回一条提取记录；模型调用失败或返回内容无法解析时返回错误
    pub async fn extract(
        &self,
        image_bytes: &[u8],
        mime_type: &str,
        fields: &FieldList,
    ) -> Result<ExtractionRecord, ExtractionError> {
        let instruction = build_instruction(fields);
        let data_url = to_data_url(image_bytes, mime_type);

        debug!(
            "发送图片到模型 {}，大小: {} 字节，字段数: {}",
            self.model.model_name(),
            image_bytes.len(),
            fields.len()
        );

        let response = self
            .model
            .analyze_image(&instruction, &data_url)
            .await
            .map_err(ExtractionError::Model)?;

        debug!("模型响应: {}", truncate_text(&response, 200));

        self.parse_response(&response)
    }

    /// 解析模型响应
    ///
    /// 去掉 markdown 代码块标记后按 JSON 对象解析
    pub fn parse_response(&self, response: &str) -> Result<ExtractionRecord, ExtractionError> {
        let cleaned = self.strip_code_fences(response);

        if cleaned.is_empty() {
            return Err(ExtractionError::EmptyResponse);
        }

        let value: JsonValue =
            serde_json::from_str(&cleaned).map_err(|source| ExtractionError::InvalidJson {
                response: truncate_text(response, 200),
                source,
            })?;

        match value {
            JsonValue::Object(map) => Ok(ExtractionRecord::new(map)),
            _ => Err(ExtractionError::NotAnObject {
                response: truncate_text(response, 200),
            }),
        }
    }

    fn strip_code_fences(&self, response: &str) -> String {
        self.fence.replace_all(response, "").trim().to_string()
    }
}

/// 构建提取指令
fn build_instruction(fields: &FieldList) -> String {
    format!(
        r#"Analyze the provided image of a bill or receipt.
Extract the following fields: {}.
Return the result as a single, minified JSON object with no extra formatting, markdown, or commentary.
The keys in the JSON should be the exact field names requested.
If a value for a field is not found, the value should be null.
Example format: {{"FieldName1": "Value1", "FieldName2": 123.45}}"#,
        fields.joined()
    )
}

/// 把图片编码为 data URL
fn to_data_url(image_bytes: &[u8], mime_type: &str) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(image_bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// 记录收到的请求并返回固定响应的模型
    struct FixedModel {
        reply: Result<String, String>,
        seen: Mutex<Vec<(String, String)>>,
    }

    impl FixedModel {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn failing(message: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(message.to_string()),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl VisionModel for FixedModel {
        fn model_name(&self) -> &str {
            "fixed"
        }

        async fn analyze_image(&self, instruction: &str, image_data_url: &str) -> Result<String> {
            self.seen
                .lock()
                .unwrap()
                .push((instruction.to_string(), image_data_url.to_string()));
            self.reply.clone().map_err(|e| anyhow::anyhow!(e))
        }
    }

    fn fields(raw: &str) -> FieldList {
        FieldList::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_extract_parses_fenced_json() {
        let model = FixedModel::replying("```json\n{\"A\":\"1\"}\n```");
        let extractor = FieldExtractor::new(model.clone()).unwrap();

        let record = extractor
            .extract(b"fake-jpeg", "image/jpeg", &fields("A"))
            .await
            .unwrap();

        assert_eq!(record.get("A"), Some(&json!("1")));
        assert_eq!(record.len(), 1);
    }

    #[tokio::test]
    async fn test_extract_sends_instruction_and_data_url() {
        let model = FixedModel::replying(r#"{"Vendor":null,"Total":12.5}"#);
        let extractor = FieldExtractor::new(model.clone()).unwrap();

        let record = extractor
            .extract(b"abc", "image/png", &fields("Vendor, Total"))
            .await
            .unwrap();
        assert_eq!(record.get("Vendor"), Some(&JsonValue::Null));
        assert_eq!(record.get("Total"), Some(&json!(12.5)));

        let seen = model.seen.lock().unwrap();
        let (instruction, data_url) = &seen[0];
        assert!(instruction.contains("Extract the following fields: Vendor, Total."));
        assert!(instruction.contains("null"));
        assert_eq!(data_url, "data:image/png;base64,YWJj");
    }

    #[tokio::test]
    async fn test_extract_reports_model_failure() {
        let extractor = FieldExtractor::new(FixedModel::failing("quota exceeded")).unwrap();

        let err = extractor
            .extract(b"abc", "image/jpeg", &fields("Total"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Model(_)));
    }

    #[test]
    fn test_parse_response_variants() {
        let extractor = FieldExtractor::new(FixedModel::replying("")).unwrap();

        let record = extractor.parse_response("```\n{\"Date\":\"2024-01-02\"}```").unwrap();
        assert_eq!(record.get("Date"), Some(&json!("2024-01-02")));

        let record = extractor.parse_response("```JSON {\"x\":1} ```").unwrap();
        assert_eq!(record.get("x"), Some(&json!(1)));

        assert!(matches!(
            extractor.parse_response("```json\n```"),
            Err(ExtractionError::EmptyResponse)
        ));
        assert!(matches!(
            extractor.parse_response("I could not read this receipt."),
            Err(ExtractionError::InvalidJson { .. })
        ));
        assert!(matches!(
            extractor.parse_response("[1, 2, 3]"),
            Err(ExtractionError::NotAnObject { .. })
        ));
    }

    #[test]
    fn test_parse_response_keeps_model_key_order() {
        let extractor = FieldExtractor::new(FixedModel::replying("")).unwrap();
        let record = extractor
            .parse_response(r#"{"Zeta":1,"Alpha":2,"Mid":3}"#)
            .unwrap();
        let keys: Vec<&String> = record.keys().collect();
        assert_eq!(keys, ["Zeta", "Alpha", "Mid"]);
    }
}
