//! 提取请求与提取结果的数据模型

use serde::Serialize;
use serde_json::{Map, Value as JsonValue};

use crate::error::ValidationError;
use crate::models::image::UploadedImage;

/// 用户指定的待提取字段列表
///
/// 由逗号分隔的原始字符串解析而来，保持用户给出的顺序（不去重）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldList(Vec<String>);

impl FieldList {
    /// 解析逗号分隔的字段字符串
    ///
    /// 每一项去掉首尾空白，丢弃空项；结果为空时返回 `ValidationError::NoFields`
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let fields: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect();

        if fields.is_empty() {
            return Err(ValidationError::NoFields);
        }

        Ok(Self(fields))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 用于提示词的字段描述
    pub fn joined(&self) -> String {
        self.0.join(", ")
    }
}

/// 一次提取请求
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub fields: FieldList,
    pub images: Vec<UploadedImage>,
}

impl ExtractionRequest {
    /// 创建提取请求
    ///
    /// 图片为空时直接拒绝，不会发出任何模型调用
    pub fn new(fields: FieldList, images: Vec<UploadedImage>) -> Result<Self, ValidationError> {
        if images.is_empty() {
            return Err(ValidationError::NoImages);
        }
        if fields.is_empty() {
            return Err(ValidationError::NoFields);
        }
        Ok(Self { fields, images })
    }
}

/// 单张图片的提取结果（表格中的一行）
///
/// 键的顺序即模型输出的顺序。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExtractionRecord(Map<String, JsonValue>);

impl ExtractionRecord {
    pub fn new(fields: Map<String, JsonValue>) -> Self {
        Self(fields)
    }

    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// 生成好的表格文件
#[derive(Debug, Clone)]
pub struct SpreadsheetDocument {
    /// xlsx 文件内容
    pub bytes: Vec<u8>,
    /// 数据行数（不含表头）
    pub rows: usize,
    /// 下载文件名
    pub file_name: String,
}

impl SpreadsheetDocument {
    /// xlsx 的标准 MIME 类型
    pub const CONTENT_TYPE: &'static str =
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

    pub fn new(bytes: Vec<u8>, rows: usize) -> Self {
        Self {
            bytes,
            rows,
            file_name: export_file_name(chrono::Utc::now().timestamp_millis()),
        }
    }
}

/// 批量处理的诊断信息
///
/// 只写入日志和响应头，不进入响应体。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// 提交的图片数量
    pub submitted: usize,
    /// 成功提取的图片数量
    pub succeeded: usize,
    /// 提取失败的图片文件名（按提交顺序）
    pub failed: Vec<String>,
}

/// 下载文件名：`AutoTally-Export-<毫秒时间戳>.xlsx`
pub fn export_file_name(timestamp_millis: i64) -> String {
    format!("AutoTally-Export-{}.xlsx", timestamp_millis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_parse_trims_and_drops_empty_pieces() {
        let fields = FieldList::parse(" Vendor , Date,,Total ,  ").unwrap();
        assert_eq!(fields.as_slice(), &["Vendor", "Date", "Total"]);
        assert_eq!(fields.joined(), "Vendor, Date, Total");
    }

    #[test]
    fn test_parse_keeps_duplicates() {
        let fields = FieldList::parse("Total,Total").unwrap();
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn test_parse_rejects_blank_input() {
        assert_eq!(FieldList::parse(""), Err(ValidationError::NoFields));
        assert_eq!(FieldList::parse("   "), Err(ValidationError::NoFields));
        assert_eq!(FieldList::parse(" , ,, "), Err(ValidationError::NoFields));
    }

    #[test]
    fn test_request_requires_images() {
        let fields = FieldList::parse("Total").unwrap();
        let err = ExtractionRequest::new(fields.clone(), Vec::new()).unwrap_err();
        assert_eq!(err, ValidationError::NoImages);

        let image = UploadedImage::new("a.jpg", "image/jpeg", PathBuf::from("a.jpg"));
        assert!(ExtractionRequest::new(fields, vec![image]).is_ok());
    }

    #[test]
    fn test_export_file_name() {
        assert_eq!(
            export_file_name(1_700_000_000_000),
            "AutoTally-Export-1700000000000.xlsx"
        );
    }
}
