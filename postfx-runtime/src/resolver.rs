//! # Resolver 模块
//!
//! 单个目标的合成算法，以及每次合成要处理的脏目标集合。
//!
//! ## 合成顺序
//!
//! 适用层按 `(priority, sequence)` 升序排列后依次叠加：
//! - 可见性：最后一个越过阈值且声明了可见性的层生效（高优先级遮蔽低优先级）
//! - 参数：顺序合成，每一层在**已合成的结果**上插值，而不是在基准值上做加权平均

use std::collections::BTreeSet;

use tracing::trace;

use crate::effect::TargetOverride;
use crate::instance::ActiveEffect;
use crate::target::Target;
use crate::value::interpolate;

/// 可见性生效的进度阈值
///
/// 可见性不插值；实例进度超过该值后才会切换。
pub const VISIBILITY_EPSILON: f32 = 0.01;

/// 本次合成需要重算的目标集合
///
/// 每次合成都重新构建：活跃实例涉及的目标 ∪ 上次合成以来被释放的目标。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirtySet {
    targets: BTreeSet<String>,
}

impl DirtySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 收集所有活跃实例涉及的目标
    pub fn from_active<'a>(active: impl IntoIterator<Item = &'a ActiveEffect>) -> Self {
        let mut set = Self::new();
        for instance in active {
            set.mark_effect(instance);
        }
        set
    }

    /// 标记某实例涉及的所有目标
    pub fn mark_effect(&mut self, active: &ActiveEffect) {
        self.targets
            .extend(active.effect().target_names().map(str::to_string));
    }

    pub fn mark(&mut self, target: impl Into<String>) {
        self.targets.insert(target.into());
    }

    /// 合并另一个集合
    pub fn absorb(&mut self, other: impl IntoIterator<Item = String>) {
        self.targets.extend(other);
    }

    pub fn contains(&self, target: &str) -> bool {
        self.targets.contains(target)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.targets.iter().map(String::as_str)
    }
}

impl IntoIterator for DirtySet {
    type Item = String;
    type IntoIter = std::collections::btree_set::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.targets.into_iter()
    }
}

/// 目标上的一个合成层
#[derive(Debug, Clone, Copy)]
pub struct Layer<'a> {
    pub priority: i32,
    pub sequence: u64,
    pub progress: f32,
    pub over: &'a TargetOverride,
}

impl<'a> Layer<'a> {
    /// 若实例覆盖了 `target`，构造对应的层
    pub fn of(active: &'a ActiveEffect, target: &str) -> Option<Self> {
        active.effect().override_for(target).map(|over| Self {
            priority: active.priority(),
            sequence: active.sequence(),
            progress: active.progress(),
            over,
        })
    }
}

/// 按合成顺序排序：优先级升序，同优先级按插入序号升序（新的后合成，胜出）
pub fn sort_layers(layers: &mut [Layer<'_>]) {
    layers.sort_by_key(|layer| (layer.priority, layer.sequence));
}

/// 合成单个目标，并把结果写入目标的实时状态
///
/// `layers` 必须已按 [`sort_layers`] 排序。为空时目标恢复到基准状态。
pub fn resolve_target(target: &mut Target, layers: &[Layer<'_>], visibility_epsilon: f32) {
    if layers.is_empty() {
        trace!(target_name = target.name(), "无适用效果，恢复基准");
        target.restore();
        return;
    }

    let mut visible = target.base_visible();
    for layer in layers {
        if let Some(v) = layer.over.visible
            && layer.progress > visibility_epsilon
        {
            visible = v;
        }
    }
    target.set_visible(visible);

    let touched: BTreeSet<&str> = layers
        .iter()
        .flat_map(|layer| layer.over.parameters.keys().map(String::as_str))
        .collect();

    for param in &touched {
        // touched 来自 layers，至少有一层覆盖了它
        let Some(first) = layers.iter().find_map(|l| l.over.parameter(param)) else {
            continue;
        };
        let mut current = target.ensure_base(param, first);

        for layer in layers {
            if let Some(value) = layer.over.parameter(param) {
                current = interpolate(&current, value, layer.progress);
            }
        }

        target.set_parameter(*param, current);
    }

    // 曾被触及但已无层覆盖的参数回到基准，不留残值
    let released: Vec<(String, crate::value::ParamValue)> = target
        .captured_parameters()
        .filter(|p| !touched.contains(p))
        .filter_map(|p| target.base_parameter(p).map(|v| (p.to_string(), v.clone())))
        .collect();
    for (param, base) in released {
        target.set_parameter(param, base);
    }

    trace!(
        target_name = target.name(),
        layers = layers.len(),
        visible,
        "目标已合成"
    );
}
