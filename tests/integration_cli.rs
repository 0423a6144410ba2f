use assert_cmd::Command;
use tempfile::tempdir;

fn typinger() -> Command {
    let mut cmd = Command::cargo_bin("typinger").unwrap();
    cmd.env_remove("TYPINGER_SCENARIO_DIR")
        .env_remove("TYPINGER_OUTPUT_DIR")
        .env_remove("TYPINGER_KEYMAP_DIR")
        .env("RUST_LOG", "off")
        .args(["--config", "/nonexistent/typinger/config.json"]);
    cmd
}

fn stdout_of(cmd: &mut Command) -> String {
    let out = cmd.assert().success().get_output().stdout.clone();
    String::from_utf8(out).unwrap()
}

#[test]
fn keymap_convert_hex_to_json_and_back() {
    let json = stdout_of(typinger().args([
        "keymap",
        "convert",
        "A5A50101000410",
        "--from",
        "hex",
        "--to",
        "json",
    ]));
    assert!(json.contains("\"code\": 4"));
    assert!(json.contains("\"mods\": 1"));

    let hex = stdout_of(
        typinger()
            .args(["keymap", "convert", "-", "--from", "json", "--to", "hex"])
            .write_stdin(json),
    );
    assert_eq!(hex.trim(), "A5A50101000410");
}

#[test]
fn keymap_convert_rejects_truncated() {
    typinger()
        .args(["keymap", "convert", "A5A501010004", "--from", "hex", "--to", "json"])
        .assert()
        .failure();
}

#[test]
fn keymap_info_reports_header() {
    let out = stdout_of(typinger().args(["keymap", "info", "A5A50101000410"]));
    assert!(out.contains("\"magic_valid\": true"));
    assert!(out.contains("\"key_count\": 1"));
    assert!(out.contains("\"size_valid\": true"));
}

#[test]
fn keymap_validate_flags_bad_entries() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(&path, r#"{"version":1,"keys":[{"code":300,"mods":0}]}"#).unwrap();

    let out = typinger()
        .args(["keymap", "validate", &format!("@{}", path.display())])
        .assert()
        .failure()
        .get_output()
        .stdout
        .clone();
    assert!(String::from_utf8(out).unwrap().contains("keys[0]"));
}

#[test]
fn keymap_preset_saves_to_keymap_dir() {
    let dir = tempdir().unwrap();
    let out = stdout_of(typinger().args([
        "keymap",
        "preset",
        "ansi",
        "--keys",
        "3",
        "--format",
        "hex",
        "--save",
        "ansi.json",
        "--keymap-dir",
        dir.path().to_str().unwrap(),
    ]));
    assert!(out.trim().starts_with("A5A5010300"));

    let listed = stdout_of(typinger().args([
        "keymap",
        "list",
        "--keymap-dir",
        dir.path().to_str().unwrap(),
    ]));
    assert_eq!(listed.trim(), "ansi.json");
}

#[test]
fn keymap_keys_searches_names() {
    let out = stdout_of(typinger().args(["keymap", "keys", "shift"]));
    assert!(out.contains("LSHIFT\t225"));
    assert!(out.contains("RSHIFT\t229"));
}

#[test]
fn scenarios_lists_builtins() {
    let dir = tempdir().unwrap();
    let out = stdout_of(typinger().args([
        "scenarios",
        "--scenario-dir",
        dir.path().to_str().unwrap(),
    ]));
    assert!(out.contains("beginner.json\t初級\t10\tbuilt-in"));
}

#[test]
fn logs_list_and_show() {
    let dir = tempdir().unwrap();
    std::fs::write(
        dir.path().join("typing_summary_20240101_000000_000000.csv"),
        "metric,value\nstatus,Completed\n",
    )
    .unwrap();
    let out_dir = dir.path().to_str().unwrap();

    let listed = stdout_of(typinger().args(["logs", "list", "--output-dir", out_dir]));
    assert!(listed.contains("typing_summary_20240101_000000_000000.csv\tsummary"));

    let shown = stdout_of(typinger().args([
        "logs",
        "show",
        "typing_summary_20240101_000000_000000.csv",
        "--output-dir",
        out_dir,
    ]));
    assert_eq!(shown, "metric,value\nstatus,Completed\n");
}

#[test]
fn practice_needs_a_tty() {
    typinger().args(["practice"]).assert().failure();
}

#[test]
fn keymap_save_show_delete() {
    let dir = tempdir().unwrap();
    let keymap_dir = dir.path().to_str().unwrap();

    let saved = stdout_of(typinger().args([
        "keymap",
        "save",
        "one.json",
        "A5A50101000410",
        "--from",
        "hex",
        "--keymap-dir",
        keymap_dir,
    ]));
    assert!(saved.trim().ends_with("one.json"));

    let shown = stdout_of(typinger().args([
        "keymap",
        "show",
        "one.json",
        "--format",
        "hex",
        "--keymap-dir",
        keymap_dir,
    ]));
    assert_eq!(shown.trim(), "A5A50101000410");

    typinger()
        .args(["keymap", "delete", "one.json", "--keymap-dir", keymap_dir])
        .assert()
        .success();
    typinger()
        .args(["keymap", "delete", "one.json", "--keymap-dir", keymap_dir])
        .assert()
        .failure();
    let listed = stdout_of(typinger().args(["keymap", "list", "--keymap-dir", keymap_dir]));
    assert!(listed.trim().is_empty());
}

#[test]
fn logs_summary_export_delete() {
    let dir = tempdir().unwrap();
    let name = "typing_summary_20240101_000000_000000.csv";
    std::fs::write(dir.path().join(name), "metric,value\nstatus,Completed\n").unwrap();
    std::fs::write(
        dir.path().join("typing_events_20240101_000000_000000.csv"),
        "timestamp_ms,kind,expected,typed,correct\n0,key,a,a,true\n",
    )
    .unwrap();
    let out_dir = dir.path().to_str().unwrap();

    let summary = stdout_of(typinger().args(["logs", "summary", "--output-dir", out_dir]));
    assert!(summary.contains("\"total_files\": 2"));
    assert!(summary.contains("\"summary_files\": 1"));
    assert!(summary.contains("\"status\": \"Completed\""));

    let export = stdout_of(typinger().args(["logs", "export", "--output-dir", out_dir]));
    assert!(export.contains("\"total_sessions\": 1"));
    assert!(export.contains("\"20240101_000000_000000\""));

    typinger()
        .args(["logs", "delete", name, "--output-dir", out_dir])
        .assert()
        .success();
    typinger()
        .args(["logs", "delete", "../escape.csv", "--output-dir", out_dir])
        .assert()
        .failure();
    let listed = stdout_of(typinger().args(["logs", "list", "--output-dir", out_dir]));
    assert!(!listed.contains(name));
    assert!(listed.contains("typing_events_20240101_000000_000000.csv"));
}
