//! postfx 命令行端到端测试

use std::path::PathBuf;
use std::process::Command;

fn postfx() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_postfx"));
    // 避免读取工作目录中的配置文件
    cmd.args(["--config", "__missing_postfx_config__.json"]);
    cmd
}

fn scenario(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../scenarios")
        .join(name)
}

#[test]
fn test_check_bundled_scenarios() {
    for name in ["demo_tint_vignette.json", "layered_priority.json"] {
        let output = postfx().arg("check").arg(scenario(name)).output().unwrap();
        assert!(
            output.status.success(),
            "{name}: {}",
            String::from_utf8_lossy(&output.stderr)
        );
    }
}

#[test]
fn test_play_json_restores_base() {
    let output = postfx()
        .args(["play", "--format", "json"])
        .arg(scenario("demo_tint_vignette.json"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let frames: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let frames = frames.as_array().unwrap();
    assert_eq!(frames.len(), 21);

    let last = frames.last().unwrap();
    assert!(last["effects"].as_array().unwrap().is_empty());
    for target in last["targets"].as_array().unwrap() {
        assert_eq!(target["visible"], false);
    }
}

#[test]
fn test_play_text_every() {
    let output = postfx()
        .args(["play", "--every", "10"])
        .arg(scenario("layered_priority.json"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let headers: Vec<&str> = stdout.lines().filter(|l| l.starts_with("== frame")).collect();
    assert_eq!(headers.len(), 2);
    assert!(headers[0].starts_with("== frame 10 "));
    assert!(headers[1].starts_with("== frame 11 "));
}

#[test]
fn test_check_rejects_invalid_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(
        &path,
        r#"{ "steps": [ { "apply": "nope" }, { "tick": { "delta": 0.0 } } ] }"#,
    )
    .unwrap();

    let output = postfx().arg("check").arg(&path).output().unwrap();
    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("nope"));
}

#[test]
fn test_init_config_refuses_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("postfx.json");

    let first = postfx().arg("init-config").arg(&path).output().unwrap();
    assert!(first.status.success());
    assert!(path.exists());

    let second = postfx().arg("init-config").arg(&path).output().unwrap();
    assert!(!second.status.success());

    let forced = postfx()
        .args(["init-config", "--force"])
        .arg(&path)
        .output()
        .unwrap();
    assert!(forced.status.success());
}
