use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 请求校验失败（用户可修正）
    #[error("请求校验失败: {0}")]
    Validation(#[from] ValidationError),
    /// 所有图片都提取失败
    #[error("全部 {attempted} 张图片提取失败")]
    TotalExtractionFailure { attempted: usize },
    /// 生成表格失败
    #[error("表格生成失败: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    Io(#[from] std::io::Error),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 请求校验错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// 没有上传图片
    #[error("No images were uploaded.")]
    NoImages,
    /// 没有指定字段
    #[error("No fields were specified for extraction.")]
    NoFields,
    /// 图片数量超过上限
    #[error("Too many images were uploaded (maximum {max}).")]
    TooManyImages { max: usize },
    /// 不支持的图片类型
    #[error("Unsupported image type: {file_name}. Use JPEG, PNG or WEBP.")]
    UnsupportedImage { file_name: String },
    /// multipart 请求体无法解析
    #[error("Invalid multipart request: {0}")]
    Multipart(String),
}

/// 单张图片的提取错误
///
/// 只在日志中出现，不会单独返回给调用方。
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// 模型调用失败
    #[error("模型调用失败: {0}")]
    Model(#[source] anyhow::Error),
    /// 模型返回内容为空
    #[error("模型返回内容为空")]
    EmptyResponse,
    /// 模型返回内容不是合法 JSON
    #[error("JSON解析失败 (响应: {response}): {source}")]
    InvalidJson {
        response: String,
        #[source]
        source: serde_json::Error,
    },
    /// 模型返回的 JSON 不是对象
    #[error("模型返回的 JSON 不是对象: {response}")]
    NotAnObject { response: String },
    /// 读取图片失败
    #[error("读取图片失败 ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 缺少必填配置
    #[error("缺少配置项 {key}")]
    MissingValue { key: String },
    /// 配置值非法
    #[error("配置项 {key} 的值 '{value}' 非法")]
    InvalidValue { key: String, value: String },
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
