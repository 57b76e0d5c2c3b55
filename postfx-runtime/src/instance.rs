//! # Instance 模块
//!
//! 活跃效果实例：一个 [`Effect`] 被应用后的时间演化。
//!
//! ## 状态机
//!
//! ```text
//! Applying ──remove()──► Removing ──progress <= 0──► (删除)
//! ```
//!
//! 没有反向转换：处于 Removing 的 ID 只能被删除，或被新的 `apply`
//! 替换成一个全新的实例。

use serde::Serialize;

use crate::effect::Effect;

/// 实例阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectPhase {
    /// 淡入 / 保持
    Applying,
    /// 淡出
    Removing,
}

/// 活跃效果实例
#[derive(Debug, Clone)]
pub struct ActiveEffect {
    effect: Effect,
    /// 混合进度（0.0 = 基准，1.0 = 完全应用）
    progress: f32,
    removing: bool,
    fade_out_duration: f32,
    /// 插入序号，优先级相同时序号大的后合成
    sequence: u64,
}

/// 按时长推进一次的步长；时长 `<= 0` 时一步到位
fn step(delta: f32, duration: f32) -> f32 {
    if duration > 0.0 { delta / duration } else { 1.0 }
}

impl ActiveEffect {
    pub(crate) fn new(effect: Effect, sequence: u64) -> Self {
        let fade_out_duration = effect.transition_duration;
        Self {
            effect,
            progress: 0.0,
            removing: false,
            fade_out_duration,
            sequence,
        }
    }

    pub fn effect(&self) -> &Effect {
        &self.effect
    }

    pub fn id(&self) -> &str {
        &self.effect.id
    }

    pub fn priority(&self) -> i32 {
        self.effect.priority
    }

    pub fn progress(&self) -> f32 {
        self.progress
    }

    pub fn is_removing(&self) -> bool {
        self.removing
    }

    pub fn fade_out_duration(&self) -> f32 {
        self.fade_out_duration
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn phase(&self) -> EffectPhase {
        if self.removing {
            EffectPhase::Removing
        } else {
            EffectPhase::Applying
        }
    }

    /// 淡出结束，应从活跃集合删除
    pub fn is_finished(&self) -> bool {
        self.removing && self.progress <= 0.0
    }

    /// 开始淡出
    ///
    /// 已在淡出中时不做任何事（不会重启或缩短进行中的淡出）。
    ///
    /// # 返回
    /// - `true`: 本次进入了 Removing
    /// - `false`: 之前已经在 Removing
    pub(crate) fn begin_removal(&mut self, fade_duration: Option<f32>) -> bool {
        if self.removing {
            return false;
        }
        self.removing = true;
        self.fade_out_duration = fade_duration.unwrap_or(self.effect.transition_duration);
        true
    }

    /// 推进进度
    ///
    /// # 返回
    /// - `true`: 实例仍然存活
    /// - `false`: 淡出完毕
    pub(crate) fn advance(&mut self, delta: f32) -> bool {
        if self.removing {
            let rate = step(delta, self.fade_out_duration);
            self.progress = (self.progress - rate).max(0.0);
        } else {
            let rate = step(delta, self.effect.transition_duration);
            self.progress = (self.progress + rate).min(1.0);
        }
        !self.is_finished()
    }
}

/// 活跃实例的只读摘要
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectSnapshot {
    pub id: String,
    pub priority: i32,
    pub progress: f32,
    pub phase: EffectPhase,
}

impl From<&ActiveEffect> for EffectSnapshot {
    fn from(active: &ActiveEffect) -> Self {
        Self {
            id: active.effect.id.clone(),
            priority: active.effect.priority,
            progress: active.progress,
            phase: active.phase(),
        }
    }
}
