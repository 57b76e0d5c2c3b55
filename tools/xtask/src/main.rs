//! # xtask - 开发辅助工具
//!
//! 提供本地质量门禁与开发辅助命令。
//!
//! ## 命令
//!
//! - `check-all`: 运行 fmt、clippy、test
//! - `cov-runtime`: 运行 postfx-runtime 覆盖率
//! - `scenario-check`: 检查场景文件（结构、效果引用、试回放）

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use postfx_runtime::{CompositorConfig, Scenario, ScenarioReport};
use walkdir::WalkDir;
use xshell::{Shell, cmd};

fn main() -> ExitCode {
    if let Err(e) = real_main() {
        eprintln!("xtask error: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn real_main() -> anyhow::Result<()> {
    let mut args = std::env::args().skip(1);
    let sub = args.next().unwrap_or_else(|| "help".to_string());

    match sub.as_str() {
        "check-all" => {
            let sh = Shell::new()?;

            eprintln!("\n==> cargo fmt --all -- --check");
            cmd!(sh, "cargo fmt --all -- --check").run()?;

            eprintln!("\n==> cargo clippy --workspace --all-targets");
            cmd!(sh, "cargo clippy --workspace --all-targets").run()?;

            eprintln!("\n==> cargo test --workspace");
            cmd!(sh, "cargo test --workspace").run()?;
        }
        "cov-runtime" => {
            let sh = Shell::new()?;
            if cmd!(sh, "cargo llvm-cov --version").quiet().run().is_err() {
                anyhow::bail!(
                    "cargo llvm-cov 不可用。\n\
请先安装：\n\
  - cargo install cargo-llvm-cov\n\
  - rustup component add llvm-tools-preview\n\
然后重试。"
                );
            }

            eprintln!("\n==> cargo llvm-cov -p postfx-runtime --html");
            cmd!(sh, "cargo llvm-cov -p postfx-runtime --html").run()?;

            eprintln!("\nCoverage HTML: target/llvm-cov/html/index.html");
        }
        "scenario-check" => {
            let path = args.next();
            scenario_check(path.as_deref())?;
        }
        "help" | "-h" | "--help" => {
            print_help();
        }
        other => anyhow::bail!("unknown xtask subcommand: {other}"),
    }

    Ok(())
}

fn print_help() {
    eprintln!(
        r#"xtask - 开发辅助工具

USAGE:
  cargo xtask <command>

COMMANDS:
  check-all       运行 fmt、clippy、test 门禁检查
  cov-runtime     运行 postfx-runtime 覆盖率报告
  scenario-check  检查场景文件

SCENARIO-CHECK:
  cargo xtask scenario-check [path]

  不带参数：检查 scenarios/ 下所有 .json 文件
  带路径参数：检查指定文件或目录

  检查内容：
    - JSON 结构错误
    - 未定义的效果引用、重复的目标或效果
    - 非法的帧间隔与淡出时长
    - 以默认配置试回放

ALIASES (in .cargo/config.toml):
  cargo check-all       -> cargo xtask check-all
  cargo scenario-check  -> cargo xtask scenario-check
"#
    );
}

//=============================================================================
// scenario-check 命令实现
//=============================================================================

/// 默认场景目录（相对于 workspace root）
const SCENARIOS_DIR: &str = "scenarios";

/// 场景检查结果
struct ScenarioCheckResult {
    /// 检查的场景数量
    scenarios_checked: usize,
    /// 解析或回放失败数量
    load_errors: usize,
    /// 回放的总帧数
    frames_played: usize,
    /// 诊断结果
    report: ScenarioReport,
}

/// 执行场景检查
fn scenario_check(path: Option<&str>) -> anyhow::Result<()> {
    let files = match path {
        Some(p) => {
            let path = PathBuf::from(p);
            if path.is_file() {
                vec![path]
            } else if path.is_dir() {
                collect_scenario_files(&path)?
            } else {
                anyhow::bail!("路径不存在: {}", p);
            }
        }
        None => {
            let dir = Path::new(SCENARIOS_DIR);
            if !dir.exists() {
                anyhow::bail!(
                    "默认场景目录不存在: {}\n请在 workspace 根目录运行，或指定场景路径",
                    dir.display()
                );
            }
            collect_scenario_files(dir)?
        }
    };

    if files.is_empty() {
        eprintln!("未找到场景文件（.json）");
        return Ok(());
    }

    eprintln!("==> 检查 {} 个场景文件...\n", files.len());

    let mut result = ScenarioCheckResult {
        scenarios_checked: 0,
        load_errors: 0,
        frames_played: 0,
        report: ScenarioReport::new(),
    };

    for file in &files {
        check_scenario_file(file, &mut result);
    }

    print_check_result(&result);

    if result.load_errors > 0 || result.report.has_errors() {
        anyhow::bail!("场景检查发现错误");
    }

    Ok(())
}

/// 收集目录下的所有场景文件
fn collect_scenario_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir) {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

/// 检查单个场景文件
fn check_scenario_file(file: &Path, result: &mut ScenarioCheckResult) {
    let scenario_id = file.display().to_string();
    result.scenarios_checked += 1;

    let content = match std::fs::read_to_string(file) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[ERROR] {}: 无法读取文件 - {}", scenario_id, e);
            result.load_errors += 1;
            return;
        }
    };

    let scenario = match Scenario::from_json(&content) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("[ERROR] {}: {}", scenario_id, e);
            result.load_errors += 1;
            return;
        }
    };

    let report = scenario.validate();
    for issue in &report.issues {
        eprintln!("{}: {}", scenario_id, issue);
    }
    let has_errors = report.has_errors();
    result.report.issues.extend(report.issues);

    if has_errors {
        return;
    }

    match scenario.play(&CompositorConfig::default()) {
        Ok(frames) => result.frames_played += frames.len(),
        Err(e) => {
            eprintln!("[ERROR] {}: 回放失败 - {}", scenario_id, e);
            result.load_errors += 1;
        }
    }
}

/// 输出检查结果
fn print_check_result(result: &ScenarioCheckResult) {
    eprintln!("─────────────────────────────────────────────────────");
    eprintln!(
        "检查完成: {} 个场景, 回放 {} 帧",
        result.scenarios_checked, result.frames_played
    );
    eprintln!();

    let error_count = result.load_errors + result.report.error_count();
    let warn_count = result.report.warn_count();

    if error_count > 0 {
        eprintln!("❌ {} 个错误, {} 个警告", error_count, warn_count);
    } else if warn_count > 0 {
        eprintln!("⚠️  0 个错误, {} 个警告", warn_count);
    } else {
        eprintln!("✅ 检查通过，无错误");
    }
}
