//! # PostFX Runtime
//!
//! 分层后处理效果合成器的核心运行时库。
//!
//! ## 架构概述
//!
//! `postfx-runtime` 是纯逻辑核心，只计算参数值，不依赖任何渲染后端。
//! 多个互不相关的调用方提交临时的视觉修改（色调、暗角、模糊强度……），
//! 合成器把它们按优先级叠加到一组共享的渲染目标上：
//!
//! ```text
//! 调用方                       Compositor                    渲染器
//!   │── apply / remove ──────►│                               │
//!   │                          │ tick(dt)                      │
//!   │                          │  推进进度 → 删除淡出完毕的实例  │
//!   │                          │  → 只重算脏目标                │
//!   │                          │──── Target（可见性 + 参数）───►│
//! ```
//!
//! ## 核心类型
//!
//! - [`Effect`]：不可变的效果定义（ID、优先级、过渡时长、目标覆盖）
//! - [`Compositor`]：持有活跃实例与目标注册表，每帧推进一次
//! - [`Target`]：渲染目标，渲染器从这里读取合成结果
//! - [`ParamValue`]：类型化参数值与插值规则
//! - [`Scenario`]：JSON 描述的回放脚本，供无头宿主和检查工具使用
//!
//! ## 模块结构
//!
//! - [`value`]：参数值与插值
//! - [`effect`]：效果定义与构建器
//! - [`target`]：目标与注册表
//! - [`instance`]：活跃实例状态机
//! - [`resolver`]：单目标合成算法与脏目标集合
//! - [`compositor`]：合成器
//! - [`scenario`]：场景回放
//! - [`config`]：配置
//! - [`error`]：错误类型定义

pub mod compositor;
pub mod config;
pub mod effect;
pub mod error;
pub mod instance;
pub mod resolver;
pub mod scenario;
pub mod target;
pub mod value;

// 重导出核心类型
pub use compositor::{ApplyOutcome, Compositor};
pub use config::CompositorConfig;
pub use effect::{DEFAULT_TRANSITION_DURATION, Effect, EffectBuilder, TargetOverride};
pub use error::{CompositorError, CompositorResult, ScenarioError};
pub use instance::{ActiveEffect, EffectPhase, EffectSnapshot};
pub use resolver::{DirtySet, VISIBILITY_EPSILON};
pub use scenario::{
    FrameSnapshot, IssueLevel, MAX_TICK_REPEAT, Scenario, ScenarioIssue, ScenarioReport, Step,
    TargetDecl,
};
pub use target::{Target, TargetRegistry, TargetSnapshot};
pub use value::{ParamValue, ValueKind, interpolate};

use serde::Serialize;

/// 效果生命周期事件
///
/// 操作发生时进入队列，由 [`Compositor::tick`] 一并返回。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "id", rename_all = "snake_case")]
pub enum EffectEvent {
    /// 新效果开始淡入
    Applied(String),
    /// 同 ID 效果被替换
    Replaced(String),
    /// 效果开始淡出
    Removing(String),
    /// 效果淡出完毕并被删除
    Retired(String),
    /// 效果被立即删除
    Cancelled(String),
}

impl EffectEvent {
    pub fn id(&self) -> &str {
        match self {
            Self::Applied(id)
            | Self::Replaced(id)
            | Self::Removing(id)
            | Self::Retired(id)
            | Self::Cancelled(id) => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_accessible() {
        let effect = Effect::builder("demo-tint")
            .target("Tint", Some(true))
            .set("intensity", 0.4)
            .build();

        let mut compositor = Compositor::new();
        compositor.register("Tint", false);
        compositor.apply(effect);

        let events = compositor.tick(0.1);
        assert_eq!(events, vec![EffectEvent::Applied("demo-tint".to_string())]);
        assert_eq!(events[0].id(), "demo-tint");
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_string(&EffectEvent::Retired("fx".to_string())).unwrap();
        assert_eq!(json, r#"{"event":"retired","id":"fx"}"#);
    }
}
