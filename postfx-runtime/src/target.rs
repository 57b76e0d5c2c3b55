//! # Target 模块
//!
//! 渲染目标注册表。
//!
//! 每个目标对应一个外部渲染的后处理层（例如一个着色器的全部输入），持有：
//! - 注册时记录的基准可见性
//! - 懒捕获的基准参数：某参数第一次被效果触及时记录，之后永不覆盖
//! - 实时状态：合成结果写在这里，由外部渲染器读取

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{CompositorError, CompositorResult};
use crate::value::ParamValue;

/// 渲染目标
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    name: String,
    base_visible: bool,
    base_params: BTreeMap<String, ParamValue>,
    visible: bool,
    params: BTreeMap<String, ParamValue>,
}

impl Target {
    /// 创建目标，`visible` 同时作为基准可见性
    pub fn new(name: impl Into<String>, visible: bool) -> Self {
        Self {
            name: name.into(),
            base_visible: visible,
            base_params: BTreeMap::new(),
            visible,
            params: BTreeMap::new(),
        }
    }

    /// 预置原生参数值（注册前由渲染层填入）
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 当前（已合成的）可见性
    pub fn visible(&self) -> bool {
        self.visible
    }

    pub fn base_visible(&self) -> bool {
        self.base_visible
    }

    /// 当前（已合成的）参数值
    pub fn parameter(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    /// 所有当前参数（按名称排序）
    pub fn parameters(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// 已捕获的基准参数值
    pub fn base_parameter(&self, name: &str) -> Option<&ParamValue> {
        self.base_params.get(name)
    }

    /// 已捕获基准值的参数名
    pub fn captured_parameters(&self) -> impl Iterator<Item = &str> {
        self.base_params.keys().map(String::as_str)
    }

    /// 捕获基准参数（幂等）
    ///
    /// 只在第一次调用时记录 `current`，之后的调用不做任何事。
    ///
    /// # 返回
    /// - `true`: 本次发生了捕获
    /// - `false`: 之前已经捕获过
    pub fn capture_base(&mut self, param: &str, current: ParamValue) -> bool {
        if self.base_params.contains_key(param) {
            return false;
        }
        self.base_params.insert(param.to_string(), current);
        true
    }

    /// 懒捕获并返回基准值
    ///
    /// 原生存储中有该参数时捕获其当前值，否则捕获 `fallback` 类型的零值。
    pub(crate) fn ensure_base(&mut self, param: &str, fallback: &ParamValue) -> ParamValue {
        if let Some(base) = self.base_params.get(param) {
            return base.clone();
        }
        let current = self
            .params
            .get(param)
            .cloned()
            .unwrap_or_else(|| fallback.zero_like());
        self.base_params.insert(param.to_string(), current.clone());
        current
    }

    /// 把可见性与所有已捕获参数恢复到基准值
    pub fn restore(&mut self) {
        self.visible = self.base_visible;
        for (param, value) in &self.base_params {
            self.params.insert(param.clone(), value.clone());
        }
    }

    pub(crate) fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub(crate) fn set_parameter(&mut self, param: impl Into<String>, value: ParamValue) {
        self.params.insert(param.into(), value);
    }

    /// 导出当前状态快照
    pub fn snapshot(&self) -> TargetSnapshot {
        TargetSnapshot {
            name: self.name.clone(),
            visible: self.visible,
            params: self.params.clone(),
        }
    }
}

/// 目标当前状态快照（供外部渲染器或调试输出使用）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetSnapshot {
    pub name: String,
    pub visible: bool,
    pub params: BTreeMap<String, ParamValue>,
}

/// 目标注册表
///
/// 目标按名称寻址；同名目标永不覆盖，避免两个独立覆盖争抢同一个槽位。
#[derive(Debug, Clone, Default)]
pub struct TargetRegistry {
    targets: HashMap<String, Target>,
}

impl TargetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册目标，失败时返回错误
    pub fn try_register(&mut self, target: Target) -> CompositorResult<()> {
        if target.name.is_empty() {
            return Err(CompositorError::EmptyTargetName);
        }
        if self.targets.contains_key(&target.name) {
            return Err(CompositorError::DuplicateTarget { name: target.name });
        }
        debug!(target_name = %target.name, visible = target.base_visible, "注册目标");
        self.targets.insert(target.name.clone(), target);
        Ok(())
    }

    /// 注册目标
    ///
    /// 重复或空名称时记录警告并跳过。
    pub fn register_target(&mut self, target: Target) -> bool {
        match self.try_register(target) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "目标注册失败");
                false
            }
        }
    }

    /// 以名称和初始可见性注册目标
    pub fn register(&mut self, name: impl Into<String>, visible: bool) -> bool {
        self.register_target(Target::new(name, visible))
    }

    /// 捕获某目标的基准参数（幂等）
    ///
    /// 目标不存在时返回 `false`。
    pub fn capture_base_param(&mut self, name: &str, param: &str, current: ParamValue) -> bool {
        self.targets
            .get_mut(name)
            .is_some_and(|t| t.capture_base(param, current))
    }

    /// 恢复目标到基准状态，目标不存在时返回 `false`
    pub fn restore(&mut self, name: &str) -> bool {
        match self.targets.get_mut(name) {
            Some(target) => {
                target.restore();
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Target> {
        self.targets.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Target> {
        self.targets.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.targets.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// 所有目标名（已排序）
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.targets.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.targets.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_duplicate() {
        let mut registry = TargetRegistry::new();

        assert!(registry.register("Tint", false));
        assert!(!registry.register("Tint", true));

        // 重复注册不会覆盖原目标
        assert_eq!(registry.len(), 1);
        assert!(!registry.get("Tint").unwrap().base_visible());
    }

    #[test]
    fn test_try_register_errors() {
        let mut registry = TargetRegistry::new();
        registry.register("Blur", true);

        assert_eq!(
            registry.try_register(Target::new("Blur", false)),
            Err(CompositorError::DuplicateTarget {
                name: "Blur".to_string()
            })
        );
        assert_eq!(
            registry.try_register(Target::new("", false)),
            Err(CompositorError::EmptyTargetName)
        );
    }

    #[test]
    fn test_capture_is_idempotent() {
        let mut registry = TargetRegistry::new();
        registry.register("Tint", false);

        assert!(registry.capture_base_param("Tint", "intensity", ParamValue::Float(0.1)));
        assert!(!registry.capture_base_param("Tint", "intensity", ParamValue::Float(0.9)));

        let target = registry.get("Tint").unwrap();
        assert_eq!(target.base_parameter("intensity"), Some(&ParamValue::Float(0.1)));

        assert!(!registry.capture_base_param("Missing", "intensity", ParamValue::Float(0.1)));
    }

    #[test]
    fn test_ensure_base_reads_native_value_once() {
        let mut target = Target::new("Vignette", false).with_param("radius", 0.6);

        let base = target.ensure_base("radius", &ParamValue::Float(0.0));
        assert_eq!(base, ParamValue::Float(0.6_f32));

        // 实时值被改写后，基准值保持不变
        target.set_parameter("radius", ParamValue::Float(0.2));
        let base = target.ensure_base("radius", &ParamValue::Float(0.0));
        assert_eq!(base, ParamValue::Float(0.6_f32));
    }

    #[test]
    fn test_ensure_base_falls_back_to_zero_of_override_type() {
        let mut target = Target::new("Tint", false);

        let base = target.ensure_base("tint_color", &ParamValue::rgb(1.0, 0.2, 0.1));
        assert_eq!(base, ParamValue::Color([0.0; 4]));
    }

    #[test]
    fn test_restore() {
        let mut registry = TargetRegistry::new();
        registry.register_target(Target::new("Tint", false).with_param("intensity", 0.0));

        {
            let target = registry.get_mut("Tint").unwrap();
            target.ensure_base("intensity", &ParamValue::Float(0.0));
            target.set_visible(true);
            target.set_parameter("intensity", ParamValue::Float(0.8));
        }

        assert!(registry.restore("Tint"));
        let target = registry.get("Tint").unwrap();
        assert!(!target.visible());
        assert_eq!(target.parameter("intensity"), Some(&ParamValue::Float(0.0)));

        assert!(!registry.restore("Missing"));
    }

    #[test]
    fn test_names_sorted() {
        let mut registry = TargetRegistry::new();
        registry.register("Vignette", false);
        registry.register("Blur", false);
        registry.register("Tint", false);

        assert_eq!(registry.names(), vec!["Blur", "Tint", "Vignette"]);
    }
}
