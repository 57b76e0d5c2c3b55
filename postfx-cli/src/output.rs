//! 帧快照输出

use postfx_runtime::{EffectEvent, EffectPhase, FrameSnapshot};

/// 文本输出选项
#[derive(Debug, Clone)]
pub struct TextOptions {
    /// 浮点数小数位
    pub precision: usize,
    /// 是否输出事件行
    pub show_events: bool,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            precision: 3,
            show_events: true,
        }
    }
}

/// 按间隔抽取帧，最后一帧总是保留
pub fn select_frames(frames: &[FrameSnapshot], every: usize) -> Vec<&FrameSnapshot> {
    let every = every.max(1);
    let last = frames.len().saturating_sub(1);
    frames
        .iter()
        .enumerate()
        .filter(|(i, frame)| frame.index % every == 0 || *i == last)
        .map(|(_, frame)| frame)
        .collect()
}

fn describe_event(event: &EffectEvent) -> String {
    let kind = match event {
        EffectEvent::Applied(_) => "applied",
        EffectEvent::Replaced(_) => "replaced",
        EffectEvent::Removing(_) => "removing",
        EffectEvent::Retired(_) => "retired",
        EffectEvent::Cancelled(_) => "cancelled",
    };
    format!("{} {}", kind, event.id())
}

/// 渲染为人类可读文本
pub fn render_text(frames: &[&FrameSnapshot], options: &TextOptions) -> String {
    let prec = options.precision;
    let mut lines: Vec<String> = Vec::new();

    for frame in frames {
        lines.push(format!("== frame {} t={:.*}s ==", frame.index, prec, frame.time));

        if options.show_events && !frame.events.is_empty() {
            let events: Vec<String> = frame.events.iter().map(describe_event).collect();
            lines.push(format!("  events: {}", events.join(", ")));
        }

        if frame.effects.is_empty() {
            lines.push("  effects: (none)".to_string());
        } else {
            lines.push("  effects:".to_string());
            for effect in &frame.effects {
                let phase = match effect.phase {
                    EffectPhase::Applying => "applying",
                    EffectPhase::Removing => "removing",
                };
                lines.push(format!(
                    "    {} priority={} progress={:.*} {}",
                    effect.id, effect.priority, prec, effect.progress, phase
                ));
            }
        }

        lines.push("  targets:".to_string());
        for target in &frame.targets {
            let mut line = format!(
                "    {} {}",
                target.name,
                if target.visible { "visible" } else { "hidden" }
            );
            for (name, value) in &target.params {
                line.push_str(&format!(" {}={:.*}", name, prec, value));
            }
            lines.push(line);
        }
    }

    let mut out = lines.join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out
}

/// 渲染为 JSON 数组
pub fn render_json(frames: &[&FrameSnapshot]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(frames)
}
