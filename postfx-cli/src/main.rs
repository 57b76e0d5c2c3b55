//! # PostFX CLI
//!
//! 无头宿主：读取场景 JSON，逐帧回放合成器，输出每帧的目标状态。
//!
//! ## 用法
//!
//! ```bash
//! cargo run -p postfx-cli -- play scenarios/demo_tint.json
//! cargo run -p postfx-cli -- play scenarios/demo_tint.json --format json --every 5
//! cargo run -p postfx-cli -- check scenarios/demo_tint.json
//! cargo run -p postfx-cli -- init-config postfx.json
//! ```

mod config;
mod output;

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use postfx_runtime::{IssueLevel, Scenario};
use tracing::{info, warn};

use config::{AppConfig, OutputFormat};
use output::TextOptions;

#[derive(Parser)]
#[command(name = "postfx")]
#[command(about = "分层后处理效果合成器 - 场景回放与检查")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 配置文件（默认：postfx.json）
    #[arg(short, long, default_value = "postfx.json", global = true)]
    config: PathBuf,

    /// 日志级别，覆盖配置文件
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// 回放场景并输出每帧状态
    Play {
        /// 场景文件路径
        scenario: PathBuf,

        /// 输出格式，覆盖配置文件
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// 每隔 N 帧输出一次（最后一帧总是输出）
        #[arg(long, default_value = "1")]
        every: usize,
    },

    /// 静态检查场景文件
    Check {
        /// 场景文件路径
        scenario: PathBuf,
    },

    /// 写出默认配置文件
    InitConfig {
        /// 输出路径
        path: PathBuf,

        /// 覆盖已存在的文件
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    match real_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn real_main() -> Result<()> {
    let cli = Cli::parse();

    let (config, config_error) = match AppConfig::load(&cli.config) {
        Ok(config) => (config, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    let level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    init_logging(level)?;

    if let Some(e) = config_error {
        warn!(path = %cli.config.display(), error = %e, "配置加载失败，使用默认配置");
    }

    match cli.command {
        Commands::Play {
            scenario,
            format,
            every,
        } => play(&config, &scenario, format, every),
        Commands::Check { scenario } => check(&scenario),
        Commands::InitConfig { path, force } => init_config(&path, force),
    }
}

fn init_logging(level: &str) -> Result<()> {
    let level: tracing::Level = level
        .parse()
        .with_context(|| format!("未知的日志级别: {level}"))?;

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
    Ok(())
}

fn load_scenario(path: &Path) -> Result<Scenario> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("无法读取场景文件: {}", path.display()))?;
    Scenario::from_json(&text).with_context(|| format!("场景解析失败: {}", path.display()))
}

fn play(config: &AppConfig, path: &Path, format: Option<OutputFormat>, every: usize) -> Result<()> {
    let scenario = load_scenario(path)?;

    let report = scenario.validate();
    for issue in &report.issues {
        match issue.level {
            IssueLevel::Warn => warn!("{}", issue),
            IssueLevel::Error => eprintln!("{}", issue),
        }
    }

    let frames = scenario.play(&config.compositor)?;
    info!(scenario = %scenario.name, frames = frames.len(), "回放完成");

    let picked = output::select_frames(&frames, every);
    let rendered = match format.unwrap_or(config.output.format) {
        OutputFormat::Text => output::render_text(
            &picked,
            &TextOptions {
                precision: config.output.precision,
                show_events: config.output.show_events,
            },
        ),
        OutputFormat::Json => output::render_json(&picked)?,
    };
    print!("{rendered}");
    Ok(())
}

fn check(path: &Path) -> Result<()> {
    let scenario = load_scenario(path)?;
    let report = scenario.validate();

    for issue in &report.issues {
        eprintln!("{}", issue);
    }

    if report.has_errors() {
        bail!(
            "{}: {} 个错误, {} 个警告",
            path.display(),
            report.error_count(),
            report.warn_count()
        );
    }

    println!(
        "✅ {}: {} 个目标, {} 个效果, {} 个步骤, {} 个警告",
        path.display(),
        scenario.targets.len(),
        scenario.effects.len(),
        scenario.steps.len(),
        report.warn_count()
    );
    Ok(())
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} 已存在（使用 --force 覆盖）", path.display());
    }

    AppConfig::default().save(path)?;
    println!("✅ 已写出默认配置: {}", path.display());
    Ok(())
}
