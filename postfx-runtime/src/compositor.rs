//! # Compositor 模块
//!
//! 后处理效果合成器。
//!
//! 合成器持有活跃实例集合与目标注册表，每帧由宿主调用一次 [`Compositor::tick`]：
//! 1. 推进每个实例的进度
//! 2. 删除淡出完毕的实例
//! 3. 构建脏目标集合，只重算这些目标
//!
//! ```rust,ignore
//! let mut compositor = Compositor::new();
//! compositor.register("Tint", false);
//!
//! compositor.apply(tint_effect);
//! loop {
//!     let events = compositor.tick(dt);
//!     let tint = compositor.target("Tint").unwrap();
//!     renderer.draw_tint(tint.visible(), tint.parameter("intensity"));
//! }
//! ```

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, warn};

use crate::config::CompositorConfig;
use crate::effect::Effect;
use crate::error::{CompositorError, CompositorResult};
use crate::instance::{ActiveEffect, EffectSnapshot};
use crate::resolver::{DirtySet, Layer, resolve_target, sort_layers};
use crate::target::{Target, TargetRegistry, TargetSnapshot};
use crate::EffectEvent;

/// `try_apply` 的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// 新插入的实例
    Inserted,
    /// 替换了同 ID 的旧实例（旧实例不淡出）
    Replaced,
}

/// 后处理效果合成器
///
/// 单线程、按帧推进。所有操作都应在调用 `tick` 的同一线程上进行。
pub struct Compositor {
    config: CompositorConfig,
    targets: TargetRegistry,
    /// 活跃实例（效果 ID -> 实例），每个 ID 至多一个
    effects: HashMap<String, ActiveEffect>,
    /// 上次合成以来被释放的目标（替换 / 立即移除）
    stale_targets: BTreeSet<String>,
    next_sequence: u64,
    events: Vec<EffectEvent>,
    /// 最近一次合成实际重算的目标
    resolved: Vec<String>,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Compositor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compositor")
            .field("targets", &self.targets.len())
            .field("effects", &self.effects.len())
            .field("stale_targets", &self.stale_targets.len())
            .finish()
    }
}

impl Compositor {
    pub fn new() -> Self {
        Self::with_config(CompositorConfig::default())
    }

    /// 使用指定配置创建合成器；配置无效时警告并回退到默认配置
    pub fn with_config(config: CompositorConfig) -> Self {
        match Self::try_with_config(config) {
            Ok(compositor) => compositor,
            Err(e) => {
                warn!(error = %e, "合成器配置无效，使用默认配置");
                Self::build(CompositorConfig::default())
            }
        }
    }

    pub fn try_with_config(config: CompositorConfig) -> CompositorResult<Self> {
        config.validate().map_err(CompositorError::InvalidConfig)?;
        Ok(Self::build(config))
    }

    fn build(config: CompositorConfig) -> Self {
        Self {
            config,
            targets: TargetRegistry::new(),
            effects: HashMap::new(),
            stale_targets: BTreeSet::new(),
            next_sequence: 1,
            events: Vec::new(),
            resolved: Vec::new(),
        }
    }

    pub fn config(&self) -> &CompositorConfig {
        &self.config
    }

    fn next_sequence(&mut self) -> u64 {
        let seq = self.next_sequence;
        self.next_sequence += 1;
        seq
    }

    /// 记录实例涉及的目标，下次合成时重算
    fn mark_stale(&mut self, active: &ActiveEffect) {
        self.stale_targets
            .extend(active.effect().target_names().map(str::to_string));
    }

    // ========== 目标管理 ==========

    /// 以名称和初始可见性注册目标；重名时警告并返回 `false`
    pub fn register(&mut self, name: impl Into<String>, visible: bool) -> bool {
        self.targets.register(name, visible)
    }

    /// 注册带有原生参数的目标；重名时警告并返回 `false`
    pub fn register_target(&mut self, target: Target) -> bool {
        self.targets.register_target(target)
    }

    pub fn try_register(&mut self, target: Target) -> CompositorResult<()> {
        self.targets.try_register(target)
    }

    pub fn registry(&self) -> &TargetRegistry {
        &self.targets
    }

    /// 获取目标的当前状态（外部渲染器读取）
    pub fn target(&self, name: &str) -> Option<&Target> {
        self.targets.get(name)
    }

    // ========== 效果控制 ==========

    /// 应用效果
    ///
    /// 同 ID 的实例（无论是否正在淡出）会被立即替换，新实例从进度 0 开始淡入。
    /// ID 为空时警告并忽略。
    pub fn apply(&mut self, effect: Effect) {
        if let Err(e) = self.try_apply(effect) {
            warn!(error = %e, "效果应用失败");
        }
    }

    /// 应用效果，失败时返回错误
    pub fn try_apply(&mut self, effect: Effect) -> CompositorResult<ApplyOutcome> {
        if effect.id.is_empty() {
            return Err(CompositorError::EmptyEffectId);
        }

        let id = effect.id.clone();
        let outcome = match self.effects.remove(&id) {
            Some(old) => {
                self.mark_stale(&old);
                ApplyOutcome::Replaced
            }
            None => ApplyOutcome::Inserted,
        };

        for name in effect.target_names() {
            if !self.targets.contains(name) {
                debug!(effect = %id, target_name = name, "效果引用了未注册的目标");
            }
        }

        let seq = self.next_sequence();
        debug!(
            effect = %id,
            priority = effect.priority,
            transition = effect.transition_duration,
            replaced = outcome == ApplyOutcome::Replaced,
            "应用效果"
        );
        self.effects.insert(id.clone(), ActiveEffect::new(effect, seq));

        self.events.push(match outcome {
            ApplyOutcome::Inserted => EffectEvent::Applied(id),
            ApplyOutcome::Replaced => EffectEvent::Replaced(id),
        });
        Ok(outcome)
    }

    /// 开始淡出效果
    ///
    /// `fade_duration` 为 `None` 时使用效果自身的过渡时长。
    /// 效果不存在或已在淡出中时不做任何事。
    ///
    /// # 返回
    /// 是否开始了新的淡出
    pub fn remove(&mut self, id: &str, fade_duration: Option<f32>) -> bool {
        let Some(active) = self.effects.get_mut(id) else {
            return false;
        };
        if !active.begin_removal(fade_duration) {
            return false;
        }
        debug!(effect = id, fade = active.fade_out_duration(), "开始淡出效果");
        self.events.push(EffectEvent::Removing(id.to_string()));
        true
    }

    /// 立即删除效果，并马上重新合成受影响的目标
    pub fn remove_instant(&mut self, id: &str) -> bool {
        let Some(active) = self.effects.remove(id) else {
            return false;
        };
        debug!(effect = id, "立即移除效果");
        self.mark_stale(&active);
        self.events.push(EffectEvent::Cancelled(id.to_string()));
        self.resolve();
        true
    }

    /// 对某个域（ID 前缀）下所有未在淡出的效果执行 [`remove`](Self::remove)
    ///
    /// # 返回
    /// 开始淡出的效果数量
    pub fn remove_domain(&mut self, prefix: &str, fade_duration: Option<f32>) -> usize {
        let mut ids: Vec<(u64, String)> = self
            .effects
            .values()
            .filter(|a| !a.is_removing() && a.effect().in_domain(prefix))
            .map(|a| (a.sequence(), a.id().to_string()))
            .collect();
        ids.sort();

        let count = ids
            .into_iter()
            .filter(|(_, id)| self.remove(id, fade_duration))
            .count();
        debug!(domain = prefix, count, "按域移除效果");
        count
    }

    /// 立即删除所有效果并恢复所有受影响目标
    pub fn clear(&mut self) {
        if self.effects.is_empty() {
            return;
        }
        let mut cancelled: Vec<ActiveEffect> = self.effects.drain().map(|(_, a)| a).collect();
        cancelled.sort_by_key(ActiveEffect::sequence);
        for active in &cancelled {
            self.mark_stale(active);
            self.events.push(EffectEvent::Cancelled(active.id().to_string()));
        }
        self.resolve();
    }

    // ========== 查询方法 ==========

    /// 效果存在且未在淡出
    pub fn has_effect(&self, id: &str) -> bool {
        self.effects.get(id).is_some_and(|a| !a.is_removing())
    }

    /// 域内存在未在淡出的效果
    pub fn has_domain(&self, prefix: &str) -> bool {
        self.effects
            .values()
            .any(|a| !a.is_removing() && a.effect().in_domain(prefix))
    }

    pub fn active_effect(&self, id: &str) -> Option<&ActiveEffect> {
        self.effects.get(id)
    }

    /// 实例进度；不存在时为 `None`
    pub fn progress(&self, id: &str) -> Option<f32> {
        self.effects.get(id).map(ActiveEffect::progress)
    }

    /// 活跃实例数（包括正在淡出的）
    pub fn active_count(&self) -> usize {
        self.effects.len()
    }

    /// 活跃实例 ID，按应用顺序
    pub fn active_ids(&self) -> Vec<&str> {
        let mut actives: Vec<&ActiveEffect> = self.effects.values().collect();
        actives.sort_by_key(|a| a.sequence());
        actives.into_iter().map(ActiveEffect::id).collect()
    }

    /// 活跃实例摘要，按应用顺序
    pub fn effect_snapshots(&self) -> Vec<EffectSnapshot> {
        let mut actives: Vec<&ActiveEffect> = self.effects.values().collect();
        actives.sort_by_key(|a| a.sequence());
        actives.into_iter().map(EffectSnapshot::from).collect()
    }

    /// 最近一次合成重算过的目标，按名称排序
    ///
    /// 渲染器可以只重新上传这些目标的参数。
    pub fn resolved_targets(&self) -> &[String] {
        &self.resolved
    }

    /// 所有目标的当前状态，按名称排序
    pub fn target_snapshots(&self) -> Vec<TargetSnapshot> {
        self.targets
            .names()
            .into_iter()
            .filter_map(|name| self.targets.get(name))
            .map(Target::snapshot)
            .collect()
    }

    // ========== 帧更新 ==========

    /// 推进一帧
    ///
    /// # 返回
    /// 上一帧以来产生的事件
    pub fn tick(&mut self, delta: f32) -> Vec<EffectEvent> {
        let delta = if delta.is_finite() && delta >= 0.0 {
            delta
        } else {
            warn!(delta, "无效的帧间隔，按 0 处理");
            0.0
        };

        if self.effects.is_empty() && self.stale_targets.is_empty() {
            self.resolved.clear();
            return std::mem::take(&mut self.events);
        }

        let mut finished: Vec<&ActiveEffect> = Vec::new();
        for active in self.effects.values_mut() {
            active.advance(delta);
        }
        for active in self.effects.values() {
            if active.is_finished() {
                finished.push(active);
            }
        }
        finished.sort_by_key(|a| a.sequence());
        let retired: Vec<String> = finished.iter().map(|a| a.id().to_string()).collect();

        for id in retired {
            if let Some(active) = self.effects.remove(&id) {
                debug!(effect = %id, "效果淡出完毕");
                self.mark_stale(&active);
                self.events.push(EffectEvent::Retired(id));
            }
        }

        self.resolve();
        std::mem::take(&mut self.events)
    }

    /// 重算脏目标
    fn resolve(&mut self) {
        let mut dirty = DirtySet::from_active(self.effects.values());
        dirty.absorb(std::mem::take(&mut self.stale_targets));

        let epsilon = self.config.visibility_epsilon;
        self.resolved.clear();
        for name in dirty {
            let Some(target) = self.targets.get_mut(&name) else {
                continue;
            };
            let mut layers: Vec<Layer<'_>> = self
                .effects
                .values()
                .filter_map(|active| Layer::of(active, &name))
                .collect();
            sort_layers(&mut layers);
            resolve_target(target, &layers, epsilon);
            self.resolved.push(name);
        }
    }
}
