//! # Effect 模块
//!
//! 效果定义：一组对若干目标的覆盖请求，以及它的优先级与过渡时长。
//!
//! `Effect` 是不可变的值类型，由调用方构造（手写、[`EffectBuilder`] 或 JSON），
//! 交给 [`Compositor::apply`](crate::Compositor::apply) 之后不再修改。
//!
//! ```rust,ignore
//! let tint = Effect::builder("demo-tint")
//!     .transition(0.5)
//!     .target("Tint", Some(true))
//!     .set("intensity", 0.4)
//!     .set("tint_color", ParamValue::rgb(1.0, 0.2, 0.1))
//!     .build();
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::ParamValue;

/// 效果的默认过渡时长（秒）
///
/// 同时作为默认淡入与默认淡出时长。
pub const DEFAULT_TRANSITION_DURATION: f32 = 0.3;

fn default_transition_duration() -> f32 {
    DEFAULT_TRANSITION_DURATION
}

/// 单个目标上的覆盖请求
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetOverride {
    /// 期望的可见性；`None` 表示不干预
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible: Option<bool>,
    /// 参数名 -> 期望值
    #[serde(default)]
    pub parameters: BTreeMap<String, ParamValue>,
}

impl TargetOverride {
    pub fn new(visible: Option<bool>) -> Self {
        Self {
            visible,
            parameters: BTreeMap::new(),
        }
    }

    /// 添加一个参数覆盖
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    /// 获取参数的覆盖值
    pub fn parameter(&self, name: &str) -> Option<&ParamValue> {
        self.parameters.get(name)
    }
}

/// 效果定义
///
/// - `priority` 越大越后合成，同参数上越"靠上"
/// - `transition_duration` 是默认淡入/淡出时长，`<= 0` 表示瞬间完成
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    /// 效果 ID（同时活跃的效果之间唯一）
    pub id: String,
    /// 合成优先级
    #[serde(default)]
    pub priority: i32,
    /// 过渡时长（秒）
    #[serde(default = "default_transition_duration")]
    pub transition_duration: f32,
    /// 目标名 -> 覆盖请求
    #[serde(default)]
    pub overrides: BTreeMap<String, TargetOverride>,
}

impl Effect {
    /// 创建空效果（无覆盖，默认优先级与过渡时长）
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            priority: 0,
            transition_duration: DEFAULT_TRANSITION_DURATION,
            overrides: BTreeMap::new(),
        }
    }

    /// 开始构建效果
    pub fn builder(id: impl Into<String>) -> EffectBuilder {
        EffectBuilder::new(id)
    }

    /// 获取对某个目标的覆盖
    pub fn override_for(&self, target: &str) -> Option<&TargetOverride> {
        self.overrides.get(target)
    }

    /// 该效果涉及的所有目标名
    pub fn target_names(&self) -> impl Iterator<Item = &str> {
        self.overrides.keys().map(String::as_str)
    }

    /// 是否属于某个域（ID 字符串前缀）
    pub fn in_domain(&self, prefix: &str) -> bool {
        self.id.starts_with(prefix)
    }
}

/// 效果构建器
///
/// `set` 总是作用于最近一次 `target` 声明的目标；
/// 尚未声明目标时 `set` 会被忽略。
#[derive(Debug, Clone)]
pub struct EffectBuilder {
    effect: Effect,
    current_target: Option<String>,
}

impl EffectBuilder {
    fn new(id: impl Into<String>) -> Self {
        Self {
            effect: Effect::new(id),
            current_target: None,
        }
    }

    /// 设置优先级
    pub fn priority(mut self, priority: i32) -> Self {
        self.effect.priority = priority;
        self
    }

    /// 设置过渡时长（秒）
    pub fn transition(mut self, duration: f32) -> Self {
        self.effect.transition_duration = duration;
        self
    }

    /// 声明一个目标；同名目标再次声明会替换之前的覆盖
    pub fn target(mut self, name: impl Into<String>, visible: Option<bool>) -> Self {
        let name = name.into();
        self.effect
            .overrides
            .insert(name.clone(), TargetOverride::new(visible));
        self.current_target = Some(name);
        self
    }

    /// 为当前目标设置参数
    pub fn set(mut self, param: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        if let Some(name) = &self.current_target
            && let Some(target) = self.effect.overrides.get_mut(name)
        {
            target.parameters.insert(param.into(), value.into());
        }
        self
    }

    pub fn build(self) -> Effect {
        self.effect
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let effect = Effect::builder("fx").build();

        assert_eq!(effect.id, "fx");
        assert_eq!(effect.priority, 0);
        assert_eq!(effect.transition_duration, DEFAULT_TRANSITION_DURATION);
        assert!(effect.overrides.is_empty());
    }

    #[test]
    fn test_builder_targets_and_params() {
        let effect = Effect::builder("demo-vignette")
            .priority(3)
            .transition(0.8)
            .target("Vignette", Some(true))
            .set("intensity", 0.9)
            .set("radius", 0.45)
            .target("Tint", None)
            .set("intensity", 0.1)
            .build();

        assert_eq!(effect.priority, 3);
        assert_eq!(effect.transition_duration, 0.8);

        let vignette = effect.override_for("Vignette").unwrap();
        assert_eq!(vignette.visible, Some(true));
        assert_eq!(
            vignette.parameter("radius"),
            Some(&ParamValue::Float(0.45_f32))
        );
        assert_eq!(vignette.parameters.len(), 2);

        let tint = effect.override_for("Tint").unwrap();
        assert_eq!(tint.visible, None);
        assert_eq!(tint.parameter("intensity"), Some(&ParamValue::Float(0.1)));

        let names: Vec<_> = effect.target_names().collect();
        assert_eq!(names, vec!["Tint", "Vignette"]);
    }

    #[test]
    fn test_set_without_target_is_ignored() {
        let effect = Effect::builder("fx").set("intensity", 1.0).build();
        assert!(effect.overrides.is_empty());
    }

    #[test]
    fn test_in_domain_is_plain_prefix() {
        let effect = Effect::new("ui-tint");
        assert!(effect.in_domain("ui-"));
        assert!(effect.in_domain("ui"));
        assert!(effect.in_domain(""));
        assert!(!effect.in_domain("world-"));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = r#"{
            "id": "hurt",
            "overrides": {
                "Tint": { "visible": true, "parameters": { "intensity": { "float": 0.6 } } }
            }
        }"#;
        let effect: Effect = serde_json::from_str(json).unwrap();

        assert_eq!(effect.priority, 0);
        assert_eq!(effect.transition_duration, DEFAULT_TRANSITION_DURATION);
        assert_eq!(
            effect.override_for("Tint").and_then(|o| o.parameter("intensity")),
            Some(&ParamValue::Float(0.6))
        );
    }
}
