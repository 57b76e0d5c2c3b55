//! # Error 模块
//!
//! 定义 postfx-runtime 中使用的错误类型。
//!
//! 合成器的常规入口（`apply` / `register` 等）遇到这些错误只记录警告并跳过，
//! `try_*` 入口则把它们原样返回给调用方。

use thiserror::Error;

/// 合成器配置错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompositorError {
    /// 效果 ID 为空
    #[error("效果 ID 为空，已忽略")]
    EmptyEffectId,

    /// 目标名为空
    #[error("目标名为空，已忽略")]
    EmptyTargetName,

    /// 目标重复注册
    #[error("目标 '{name}' 已注册，请重命名其中一个")]
    DuplicateTarget { name: String },

    /// 合成器配置无效
    #[error("合成器配置无效: {0}")]
    InvalidConfig(String),
}

/// 场景错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScenarioError {
    /// JSON 解析失败
    #[error("场景解析失败: {0}")]
    Parse(String),

    /// 场景校验未通过
    #[error("场景校验失败：{errors} 个错误")]
    Invalid { errors: usize },
}

impl From<serde_json::Error> for ScenarioError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

/// Result 类型别名
pub type CompositorResult<T> = Result<T, CompositorError>;
