//! # Config 模块
//!
//! 合成器的可调参数。宿主可以从配置文件反序列化，缺省字段取默认值。

use serde::{Deserialize, Serialize};

use crate::resolver::VISIBILITY_EPSILON;

/// 合成器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositorConfig {
    /// 可见性生效的进度阈值
    #[serde(default = "default_visibility_epsilon")]
    pub visibility_epsilon: f32,
}

fn default_visibility_epsilon() -> f32 {
    VISIBILITY_EPSILON
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            visibility_epsilon: default_visibility_epsilon(),
        }
    }
}

impl CompositorConfig {
    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..1.0).contains(&self.visibility_epsilon) {
            return Err(format!(
                "visibility_epsilon 必须在 [0.0, 1.0) 之间，实际为 {}",
                self.visibility_epsilon
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CompositorConfig::default();
        assert_eq!(config.visibility_epsilon, 0.01);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: CompositorConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, CompositorConfig::default());
    }

    #[test]
    fn test_validation() {
        let config = CompositorConfig {
            visibility_epsilon: 1.0,
        };
        assert!(config.validate().is_err());

        let config = CompositorConfig {
            visibility_epsilon: f32::NAN,
        };
        assert!(config.validate().is_err());
    }
}
