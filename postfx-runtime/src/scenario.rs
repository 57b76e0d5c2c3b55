//! # Scenario 模块
//!
//! 用 JSON 描述的效果回放脚本：一组目标、一个效果库和一串操作步骤。
//! 无头宿主用它回放并输出每帧状态，检查工具用它做静态校验。
//!
//! ```json
//! {
//!   "name": "demo",
//!   "targets": [
//!     { "name": "Tint", "visible": false, "params": { "intensity": { "float": 0.0 } } }
//!   ],
//!   "effects": [
//!     { "id": "demo-tint", "transition_duration": 0.5,
//!       "overrides": { "Tint": { "visible": true,
//!                                "parameters": { "intensity": { "float": 0.4 } } } } }
//!   ],
//!   "steps": [
//!     { "apply": "demo-tint" },
//!     { "tick": { "delta": 0.25, "repeat": 2 } },
//!     { "remove": { "id": "demo-tint" } },
//!     { "tick": { "delta": 0.5 } }
//!   ]
//! }
//! ```
//!
//! ## 校验级别
//!
//! - Error：场景无法正确回放（重复目标、重复/空效果 ID、引用未定义效果、非法帧间隔）
//! - Warn：可以回放但很可能写错（覆盖了未声明的目标、移除从未应用的效果）

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::compositor::Compositor;
use crate::config::CompositorConfig;
use crate::effect::Effect;
use crate::error::ScenarioError;
use crate::instance::EffectSnapshot;
use crate::target::{Target, TargetSnapshot};
use crate::value::ParamValue;
use crate::EffectEvent;

/// 单个 tick 步骤允许的最大重复帧数
pub const MAX_TICK_REPEAT: u32 = 10_000;

fn default_repeat() -> u32 {
    1
}

/// 场景中的目标声明
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetDecl {
    pub name: String,
    #[serde(default)]
    pub visible: bool,
    /// 原生参数初值
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,
}

impl TargetDecl {
    fn to_target(&self) -> Target {
        self.params
            .iter()
            .fold(Target::new(self.name.clone(), self.visible), |t, (k, v)| {
                t.with_param(k.clone(), v.clone())
            })
    }
}

/// 回放步骤
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// 应用效果库中的效果
    Apply(String),
    /// 淡出效果
    Remove {
        id: String,
        #[serde(default)]
        fade: Option<f32>,
    },
    /// 立即移除效果
    RemoveInstant(String),
    /// 按域淡出
    RemoveDomain {
        prefix: String,
        #[serde(default)]
        fade: Option<f32>,
    },
    /// 推进 `repeat` 帧，每帧 `delta` 秒
    Tick {
        delta: f32,
        #[serde(default = "default_repeat")]
        repeat: u32,
    },
}

/// 效果回放场景
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub targets: Vec<TargetDecl>,
    #[serde(default)]
    pub effects: Vec<Effect>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// 校验级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IssueLevel {
    /// 警告（建议修复）
    Warn,
    /// 错误（必须修复）
    Error,
}

impl std::fmt::Display for IssueLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// 校验条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioIssue {
    pub level: IssueLevel,
    /// 步骤序号（从 1 开始），与步骤无关时为 `None`
    pub step: Option<usize>,
    pub message: String,
}

impl ScenarioIssue {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: IssueLevel::Error,
            step: None,
            message: message.into(),
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self {
            level: IssueLevel::Warn,
            step: None,
            message: message.into(),
        }
    }

    pub fn at_step(mut self, step: usize) -> Self {
        self.step = Some(step);
        self
    }
}

impl std::fmt::Display for ScenarioIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.level)?;
        if let Some(step) = self.step {
            write!(f, " 步骤 {}", step)?;
        }
        write!(f, ": {}", self.message)
    }
}

/// 校验结果
#[derive(Debug, Clone, Default)]
pub struct ScenarioReport {
    pub issues: Vec<ScenarioIssue>,
}

impl ScenarioReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: ScenarioIssue) {
        self.issues.push(issue);
    }

    pub fn error_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.level == IssueLevel::Error)
            .count()
    }

    pub fn warn_count(&self) -> usize {
        self.issues
            .iter()
            .filter(|i| i.level == IssueLevel::Warn)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }
}

/// 一帧结束后的完整状态
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSnapshot {
    /// 帧序号（从 1 开始）
    pub index: usize,
    /// 累计时间（秒）
    pub time: f32,
    /// 本帧返回的事件
    pub events: Vec<EffectEvent>,
    /// 帧结束时的活跃实例
    pub effects: Vec<EffectSnapshot>,
    /// 帧结束时的目标状态
    pub targets: Vec<TargetSnapshot>,
}

impl Scenario {
    /// 从 JSON 文本解析
    pub fn from_json(text: &str) -> Result<Self, ScenarioError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, ScenarioError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// 按 ID 查找效果库中的效果
    pub fn effect(&self, id: &str) -> Option<&Effect> {
        self.effects.iter().find(|e| e.id == id)
    }

    /// 静态校验
    pub fn validate(&self) -> ScenarioReport {
        let mut report = ScenarioReport::new();

        let mut target_names = HashSet::new();
        for decl in &self.targets {
            if decl.name.is_empty() {
                report.push(ScenarioIssue::error("目标名为空"));
            } else if !target_names.insert(decl.name.as_str()) {
                report.push(ScenarioIssue::error(format!("目标 '{}' 重复声明", decl.name)));
            }
        }

        let mut effect_ids = HashSet::new();
        for effect in &self.effects {
            if effect.id.is_empty() {
                report.push(ScenarioIssue::error("效果 ID 为空"));
                continue;
            }
            if !effect_ids.insert(effect.id.as_str()) {
                report.push(ScenarioIssue::error(format!("效果 '{}' 重复定义", effect.id)));
            }
            for name in effect.target_names() {
                if !target_names.contains(name) {
                    report.push(ScenarioIssue::warn(format!(
                        "效果 '{}' 覆盖了未声明的目标 '{}'",
                        effect.id, name
                    )));
                }
            }
        }

        let mut applied: HashSet<&str> = HashSet::new();
        for (i, step) in self.steps.iter().enumerate() {
            let n = i + 1;
            match step {
                Step::Apply(id) => {
                    if effect_ids.contains(id.as_str()) {
                        applied.insert(id.as_str());
                    } else {
                        report.push(
                            ScenarioIssue::error(format!("引用了未定义的效果 '{}'", id)).at_step(n),
                        );
                    }
                }
                Step::Remove { id, fade } => {
                    if !applied.contains(id.as_str()) {
                        report.push(
                            ScenarioIssue::warn(format!("移除从未应用的效果 '{}'", id)).at_step(n),
                        );
                    }
                    check_fade(&mut report, *fade, n);
                }
                Step::RemoveInstant(id) => {
                    if !applied.contains(id.as_str()) {
                        report.push(
                            ScenarioIssue::warn(format!("移除从未应用的效果 '{}'", id)).at_step(n),
                        );
                    }
                }
                Step::RemoveDomain { fade, .. } => check_fade(&mut report, *fade, n),
                Step::Tick { delta, repeat } => {
                    if !delta.is_finite() || *delta <= 0.0 {
                        report.push(
                            ScenarioIssue::error(format!("帧间隔必须为正数，实际为 {}", delta))
                                .at_step(n),
                        );
                    }
                    if *repeat == 0 {
                        report.push(ScenarioIssue::error("repeat 不能为 0").at_step(n));
                    } else if *repeat > MAX_TICK_REPEAT {
                        report.push(
                            ScenarioIssue::error(format!(
                                "repeat 不能超过 {}，实际为 {}",
                                MAX_TICK_REPEAT, repeat
                            ))
                            .at_step(n),
                        );
                    }
                }
            }
        }

        report
    }

    /// 回放场景，返回每一帧结束后的状态
    ///
    /// 校验存在错误时拒绝回放。
    pub fn play(&self, config: &CompositorConfig) -> Result<Vec<FrameSnapshot>, ScenarioError> {
        let report = self.validate();
        if report.has_errors() {
            return Err(ScenarioError::Invalid {
                errors: report.error_count(),
            });
        }

        let mut compositor = Compositor::with_config(config.clone());
        for decl in &self.targets {
            compositor.register_target(decl.to_target());
        }

        let mut frames = Vec::new();
        let mut time = 0.0_f32;

        for step in &self.steps {
            match step {
                Step::Apply(id) => {
                    if let Some(effect) = self.effect(id) {
                        compositor.apply(effect.clone());
                    }
                }
                Step::Remove { id, fade } => {
                    compositor.remove(id, *fade);
                }
                Step::RemoveInstant(id) => {
                    compositor.remove_instant(id);
                }
                Step::RemoveDomain { prefix, fade } => {
                    compositor.remove_domain(prefix, *fade);
                }
                Step::Tick { delta, repeat } => {
                    for _ in 0..*repeat {
                        let events = compositor.tick(*delta);
                        time += *delta;
                        frames.push(FrameSnapshot {
                            index: frames.len() + 1,
                            time,
                            events,
                            effects: compositor.effect_snapshots(),
                            targets: compositor.target_snapshots(),
                        });
                    }
                }
            }
        }

        debug!(scenario = %self.name, frames = frames.len(), "场景回放完成");
        Ok(frames)
    }
}

fn check_fade(report: &mut ScenarioReport, fade: Option<f32>, step: usize) {
    if let Some(fade) = fade
        && !fade.is_finite()
    {
        report.push(ScenarioIssue::error("淡出时长必须是有限数").at_step(step));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::EffectPhase;

    const DEMO: &str = r#"{
        "name": "demo",
        "targets": [
            { "name": "Tint", "visible": false, "params": { "intensity": { "float": 0.0 } } },
            { "name": "Vignette", "visible": false }
        ],
        "effects": [
            {
                "id": "demo-tint",
                "transition_duration": 0.5,
                "overrides": {
                    "Tint": { "visible": true, "parameters": { "intensity": { "float": 0.5 } } }
                }
            }
        ],
        "steps": [
            { "apply": "demo-tint" },
            { "tick": { "delta": 0.25, "repeat": 2 } },
            { "remove": { "id": "demo-tint" } },
            { "tick": { "delta": 0.5 } }
        ]
    }"#;

    #[test]
    fn test_parse() {
        let scenario = Scenario::from_json(DEMO).unwrap();
        assert_eq!(scenario.name, "demo");
        assert_eq!(scenario.targets.len(), 2);
        assert_eq!(
            scenario.steps[1],
            Step::Tick {
                delta: 0.25,
                repeat: 2
            }
        );
        assert_eq!(
            scenario.steps[2],
            Step::Remove {
                id: "demo-tint".to_string(),
                fade: None
            }
        );
    }

    #[test]
    fn test_parse_error() {
        let err = Scenario::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ScenarioError::Parse(_)));
    }

    #[test]
    fn test_play() {
        let scenario = Scenario::from_json(DEMO).unwrap();
        let frames = scenario.play(&CompositorConfig::default()).unwrap();

        assert_eq!(frames.len(), 3);

        let first = &frames[0];
        assert_eq!(first.index, 1);
        assert_eq!(first.time, 0.25);
        assert_eq!(first.events, vec![EffectEvent::Applied("demo-tint".to_string())]);
        assert_eq!(first.effects[0].progress, 0.5);
        assert_eq!(first.effects[0].phase, EffectPhase::Applying);
        assert_eq!(first.targets[0].params["intensity"], ParamValue::Float(0.25));

        let last = &frames[2];
        assert!(last.effects.is_empty());
        assert_eq!(
            last.events,
            vec![
                EffectEvent::Removing("demo-tint".to_string()),
                EffectEvent::Retired("demo-tint".to_string()),
            ]
        );
        assert!(!last.targets[0].visible);
        assert_eq!(last.targets[0].params["intensity"], ParamValue::Float(0.0));
    }

    #[test]
    fn test_validate_clean() {
        let scenario = Scenario::from_json(DEMO).unwrap();
        let report = scenario.validate();
        assert_eq!(report.error_count(), 0);
        assert_eq!(report.warn_count(), 0);
    }

    #[test]
    fn test_validate_errors_and_warnings() {
        let scenario = Scenario {
            name: "broken".to_string(),
            targets: vec![
                TargetDecl {
                    name: "Tint".to_string(),
                    visible: false,
                    params: BTreeMap::new(),
                },
                TargetDecl {
                    name: "Tint".to_string(),
                    visible: true,
                    params: BTreeMap::new(),
                },
            ],
            effects: vec![
                Effect::builder("a").target("Bloom", Some(true)).build(),
                Effect::builder("a").build(),
            ],
            steps: vec![
                Step::Apply("missing".to_string()),
                Step::Remove {
                    id: "a".to_string(),
                    fade: None,
                },
                Step::Tick {
                    delta: 0.0,
                    repeat: 0,
                },
            ],
        };

        let report = scenario.validate();
        // 重复目标、重复效果、未定义效果、非法间隔、repeat 为 0
        assert_eq!(report.error_count(), 5);
        // 未声明目标、移除从未应用的效果
        assert_eq!(report.warn_count(), 2);

        let step_issue = report.issues.iter().find(|i| i.step == Some(1)).unwrap();
        assert_eq!(
            step_issue.to_string(),
            "[ERROR] 步骤 1: 引用了未定义的效果 'missing'"
        );

        assert_eq!(
            scenario.play(&CompositorConfig::default()),
            Err(ScenarioError::Invalid { errors: 5 })
        );
    }

    #[test]
    fn test_repeat_limit() {
        let mut scenario = Scenario::from_json(DEMO).unwrap();
        scenario.steps = vec![Step::Tick {
            delta: 0.016,
            repeat: 4_000_000_000,
        }];

        let report = scenario.validate();
        assert_eq!(report.error_count(), 1);
        assert_eq!(report.issues[0].step, Some(1));
        assert_eq!(
            scenario.play(&CompositorConfig::default()),
            Err(ScenarioError::Invalid { errors: 1 })
        );

        scenario.steps = vec![Step::Tick {
            delta: 0.016,
            repeat: MAX_TICK_REPEAT,
        }];
        assert!(!scenario.validate().has_errors());
    }

    #[test]
    fn test_round_trip_preserves_steps() {
        let scenario = Scenario::from_json(DEMO).unwrap();
        let json = scenario.to_json().unwrap();
        let reparsed = Scenario::from_json(&json).unwrap();
        assert_eq!(reparsed, scenario);
    }
}
