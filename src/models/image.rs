//! 上传图片的描述与类型识别

use std::fmt::Display;
use std::path::{Path, PathBuf};

use phf::phf_map;

/// 扩展名 → MIME 类型
static EXTENSION_MIME: phf::Map<&'static str, &'static str> = phf_map! {
    "jpg" => "image/jpeg",
    "jpeg" => "image/jpeg",
    "png" => "image/png",
    "webp" => "image/webp",
};

/// 已暂存到磁盘的上传图片
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    /// 客户端提供的原始文件名（仅用于日志和诊断）
    pub file_name: String,
    /// 识别出的 MIME 类型
    pub mime_type: &'static str,
    /// 暂存文件路径
    pub path: PathBuf,
}

impl UploadedImage {
    pub fn new(file_name: impl Into<String>, mime_type: &'static str, path: PathBuf) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type,
            path,
        }
    }
}

/// 识别上传图片的 MIME 类型
///
/// 优先使用 multipart 中声明的 content-type，无法识别时退回到文件扩展名。
/// 返回 `None` 表示不是受支持的图片格式。
pub fn resolve_mime_type(file_name: &str, content_type: Option<&str>) -> Option<&'static str> {
    let declared = content_type.map(|ct| {
        ct.split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
    });

    if let Some(declared) = declared.as_deref() {
        let normalized = if declared == "image/jpg" { "image/jpeg" } else { declared };
        if let Some(mime) = EXTENSION_MIME.values().find(|m| **m == normalized) {
            return Some(*mime);
        }
    }

    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())?
        .to_ascii_lowercase();

    EXTENSION_MIME.get(extension.as_str()).copied()
}

/// 暂存文件使用的扩展名
pub fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "jpg",
    }
}

/// 单张图片的处理上下文
///
/// 封装"我正在处理这批图片中的第几张"这一信息
#[derive(Debug, Clone)]
pub struct ImageCtx {
    /// 图片在本次请求中的序号（从1开始）
    pub index: usize,
    /// 本次请求的图片总数
    pub total: usize,
    /// 原始文件名
    pub file_name: String,
}

impl ImageCtx {
    pub fn new(index: usize, total: usize, file_name: impl Into<String>) -> Self {
        Self {
            index,
            total,
            file_name: file_name.into(),
        }
    }
}

impl Display for ImageCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[图片 {}/{} {}]", self.index, self.total, self.file_name)
    }
}
