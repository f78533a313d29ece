use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// 默认配置文件名（存在时才加载）
const DEFAULT_CONFIG_FILE: &str = "review_exporter.toml";

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// 所有任务的输出根目录
    pub output_root: PathBuf,
    /// 单条入站消息的最大字节数
    pub max_inbound_message_bytes: usize,
    /// 图片 URL 升级后的目标宽度
    pub max_image_resolution: u32,
    /// 单个任务内同时下载的图片数量
    pub max_concurrent_downloads: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4567,
            output_root: PathBuf::from("output"),
            max_inbound_message_bytes: 64 * 1024 * 1024,
            max_image_resolution: 2400,
            max_concurrent_downloads: 8,
        }
    }
}

impl Config {
    /// 加载配置：默认值 ← TOML 文件（可选） ← 环境变量
    pub fn load() -> Result<Self> {
        let path = std::env::var("CONFIG_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE));

        let base = if path.is_file() {
            Self::from_toml_file(&path)?
        } else {
            Self::default()
        };

        Ok(base.with_env_overrides())
    }

    /// 只使用默认值和环境变量
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件读取，缺失的字段使用默认值
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("无法读取配置文件: {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("无法解析配置文件: {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn with_env_overrides(self) -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or(self.host),
            port: env_parse("PORT").unwrap_or(self.port),
            output_root: std::env::var("OUTPUT_ROOT").map(PathBuf::from).unwrap_or(self.output_root),
            max_inbound_message_bytes: env_parse("MAX_INBOUND_MESSAGE_BYTES").unwrap_or(self.max_inbound_message_bytes),
            max_image_resolution: env_parse("MAX_IMAGE_RESOLUTION").unwrap_or(self.max_image_resolution),
            max_concurrent_downloads: env_parse::<usize>("MAX_CONCURRENT_DOWNLOADS")
                .filter(|n| *n > 0)
                .unwrap_or(self.max_concurrent_downloads),
        }
    }

    /// 监听地址，形如 `127.0.0.1:4567`
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            port = 9000
            output_root = "/tmp/exports"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.output_root, PathBuf::from("/tmp/exports"));
        // 未配置的字段保持默认
        assert_eq!(config.max_image_resolution, 2400);
        assert_eq!(config.max_concurrent_downloads, 8);
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn test_invalid_toml_is_rejected() {
        assert!(Config::from_toml_str("port = \"not a number\"").is_err());
    }

    #[test]
    fn test_listen_addr() {
        let config = Config::default();
        assert_eq!(config.listen_addr(), "127.0.0.1:4567");
    }
}
