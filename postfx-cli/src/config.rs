//! # Config 模块
//!
//! 宿主配置管理。
//!
//! ## 配置优先级
//!
//! 1. 命令行参数（最高）
//! 2. 配置文件（默认 `postfx.json`）
//! 3. 默认值（最低）

use std::fs;
use std::path::Path;

use postfx_runtime::CompositorConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// 人类可读的逐帧文本
    #[default]
    Text,
    /// 帧快照 JSON 数组
    Json,
}

/// 应用配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// 日志级别（trace/debug/info/warn/error）
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// 合成器配置
    #[serde(default)]
    pub compositor: CompositorConfig,

    /// 输出配置
    #[serde(default)]
    pub output: OutputConfig,
}

/// 输出配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,

    /// 浮点数保留的小数位数
    #[serde(default = "default_precision")]
    pub precision: usize,

    /// 文本输出中是否显示事件
    #[serde(default = "default_show_events")]
    pub show_events: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            compositor: CompositorConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            precision: default_precision(),
            show_events: default_show_events(),
        }
    }
}

// 默认值函数
fn default_log_level() -> String {
    "warn".to_string()
}

fn default_precision() -> usize {
    3
}

fn default_show_events() -> bool {
    true
}

impl AppConfig {
    /// 加载配置文件
    ///
    /// 文件不存在时返回默认配置；读取或解析失败时返回错误，由调用方决定是否回退。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialization(e.to_string()))?;

        fs::write(path, json).map_err(|e| ConfigError::Io(e.to_string()))?;

        Ok(())
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_level.parse::<tracing::Level>().is_err() {
            return Err(ConfigError::Validation(format!(
                "未知的日志级别: {}",
                self.log_level
            )));
        }

        self.compositor.validate().map_err(ConfigError::Validation)?;

        if self.output.precision > 9 {
            return Err(ConfigError::Validation(
                "precision 必须在 0 - 9 之间".to_string(),
            ));
        }

        Ok(())
    }
}

/// 配置错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// 序列化失败
    #[error("配置序列化失败: {0}")]
    Serialization(String),
    /// 解析失败
    #[error("配置解析失败: {0}")]
    Parse(String),
    /// IO 错误
    #[error("配置 IO 错误: {0}")]
    Io(String),
    /// 验证失败
    #[error("配置验证失败: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.log_level, "warn");
        assert!(config.validate().is_ok());
        assert_eq!(config.output.precision, 3);
        assert_eq!(config.output.format, OutputFormat::Text);
        assert_eq!(config.compositor.visibility_epsilon, 0.01);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(dir.path().join("absent.json")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("postfx.json");

        let mut config = AppConfig {
            log_level: "debug".to_string(),
            ..AppConfig::default()
        };
        config.output.format = OutputFormat::Json;
        config.compositor.visibility_epsilon = 0.05;
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("postfx.json");
        std::fs::write(&path, r#"{ "output": { "format": "json" } }"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.output.precision, 3);
        assert!(config.output.show_events);
    }

    #[test]
    fn test_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("postfx.json");
        std::fs::write(&path, "{ broken").unwrap();

        assert!(matches!(AppConfig::load(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig {
            log_level: "loud".to_string(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());

        config.log_level = "info".to_string();
        assert!(config.validate().is_ok());

        config.output.precision = 12;
        assert!(config.validate().is_err());

        config.output.precision = 2;
        config.compositor.visibility_epsilon = -0.1;
        assert!(config.validate().is_err());
    }
}
