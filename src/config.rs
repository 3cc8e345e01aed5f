use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::ConfigError;

/// 默认配置文件名（位于工作目录）
const DEFAULT_CONFIG_FILE: &str = "autotally.toml";

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP 监听地址
    pub bind_addr: String,
    /// 上传图片的临时存放目录
    pub upload_dir: PathBuf,
    /// 单次请求最多接受的图片数量
    pub max_images_per_request: usize,
    /// 请求体大小上限（字节）
    pub max_body_bytes: usize,
    /// 同时进行的模型调用数量
    pub max_concurrent_extractions: usize,
    /// 单张图片提取失败后的重试次数
    pub max_retries: u32,
    /// 模型请求超时（秒）
    pub request_timeout_secs: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3001".to_string(),
            upload_dir: PathBuf::from("images"),
            max_images_per_request: 100,
            max_body_bytes: 256 * 1024 * 1024,
            max_concurrent_extractions: 100,
            max_retries: 0,
            request_timeout_secs: 120,
            verbose_logging: false,
            llm_api_key: String::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            llm_model_name: "gemini-1.5-flash".to_string(),
        }
    }
}

impl Config {
    /// 从环境变量加载配置（在默认值之上覆盖）
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 加载完整配置
    ///
    /// 优先级：环境变量 > TOML 配置文件 > 默认值。
    /// 配置文件路径取自 `AUTOTALLY_CONFIG`，未设置时尝试工作目录下的 `autotally.toml`。
    pub fn load() -> Result<Self> {
        let explicit = std::env::var("AUTOTALLY_CONFIG").ok().map(PathBuf::from);
        let base = match explicit {
            Some(path) => Self::from_file(&path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        let config = base.with_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件读取配置，缺省字段使用默认值
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("无法解析配置文件: {}", path.display()))?;

        Ok(config)
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.llm_api_key.trim().is_empty() {
            return Err(ConfigError::MissingValue {
                key: "llm_api_key".to_string(),
            });
        }

        let limits = [
            ("max_images_per_request", self.max_images_per_request),
            ("max_body_bytes", self.max_body_bytes),
            ("max_concurrent_extractions", self.max_concurrent_extractions),
        ];
        for (key, value) in limits {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                });
            }
        }

        Ok(())
    }

    fn with_env_overrides(self) -> Self {
        fn env(name: &str) -> Option<String> {
            std::env::var(name).ok()
        }
        fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
            env(name).and_then(|v| v.parse().ok())
        }

        Self {
            bind_addr: env("BIND_ADDR").unwrap_or(self.bind_addr),
            upload_dir: env("UPLOAD_DIR").map(PathBuf::from).unwrap_or(self.upload_dir),
            max_images_per_request: parsed("MAX_IMAGES_PER_REQUEST").unwrap_or(self.max_images_per_request),
            max_body_bytes: parsed("MAX_BODY_BYTES").unwrap_or(self.max_body_bytes),
            max_concurrent_extractions: parsed("MAX_CONCURRENT_EXTRACTIONS").unwrap_or(self.max_concurrent_extractions),
            max_retries: parsed("MAX_RETRIES").unwrap_or(self.max_retries),
            request_timeout_secs: parsed("REQUEST_TIMEOUT_SECS").unwrap_or(self.request_timeout_secs),
            verbose_logging: parsed("VERBOSE_LOGGING").unwrap_or(self.verbose_logging),
            llm_api_key: env("LLM_API_KEY")
                .or_else(|| env("GEMINI_API_KEY"))
                .unwrap_or(self.llm_api_key),
            llm_api_base_url: env("LLM_API_BASE_URL").unwrap_or(self.llm_api_base_url),
            llm_model_name: env("LLM_MODEL_NAME").unwrap_or(self.llm_model_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_toml_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
bind_addr = "127.0.0.1:8080"
max_retries = 2
llm_model_name = "gemini-2.0-flash"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.llm_model_name, "gemini-2.0-flash");
        // 未出现的字段保持默认值
        assert_eq!(config.max_images_per_request, 100);
        assert_eq!(config.upload_dir, PathBuf::from("images"));
    }

    #[test]
    fn test_validate_requires_api_key() {
        let config = Config::default();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingValue { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_limits() {
        let config = Config {
            llm_api_key: "key".to_string(),
            max_concurrent_extractions: 0,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
