use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "dcb-sim-{prefix}-{}-{nanos}",
        std::process::id()
    ));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn write_file(dir: &Path, name: &str, contents: &[u8]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write temp file");
    path
}

fn topo_tool(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_topo_tool"))
        .args(args)
        .output()
        .expect("run topo_tool")
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "topo_tool failed: stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
}

/// 从 `key=value key=value` 形式的行中取出某个计数
fn counter(line: &str, key: &str) -> u64 {
    line.split_whitespace()
        .find_map(|kv| kv.strip_prefix(&format!("{key}=")))
        .unwrap_or_else(|| panic!("missing {key} in {line:?}"))
        .parse()
        .expect("counter value")
}

const LINE_JSON: &str = r#"
{
    "nodes": [
        { "id": 1, "role": "host", "port_count": 1 },
        { "id": 2, "role": "switch", "port_count": 2 },
        { "id": 3, "role": "host", "port_count": 1 }
    ],
    "links": [
        { "src_id": 1, "dst_id": 2, "capacity_gbps": 10.0, "latency_ns": 1000 },
        { "src_id": 3, "dst_id": 2, "capacity_gbps": 10.0, "latency_ns": 1000, "dst_port": 1 }
    ]
}
"#;

#[test]
fn preset_dumbbell_binary_inspects_cleanly() {
    let dir = unique_temp_dir("preset-dumbbell");
    let bin = dir.join("dumbbell.bin");

    let output = topo_tool(&["preset", "dumbbell", "--output", bin.to_str().unwrap()]);
    assert_success(&output);
    let raw = fs::read(&bin).expect("read dumbbell.bin");
    assert_eq!(&raw[..4], b"DCTP");

    let output = topo_tool(&["inspect", "--input", bin.to_str().unwrap()]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut lines = stdout.lines();
    assert_eq!(lines.next(), Some("nodes=6 hosts=4 switches=2 links=5"));
    assert_eq!(lines.next(), Some("node 0 host ports=1"));
    let port = lines.next().expect("port line of node 0");
    assert!(port.starts_with("  port 0 mac="), "unexpected line {port:?}");
    assert!(port.ends_with("peer=4:0"), "unexpected line {port:?}");
    assert!(
        stdout.contains("node 4 switch ports=3"),
        "missing left switch: {stdout}"
    );

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn preset_fat_tree_counts_nodes_and_links() {
    let dir = unique_temp_dir("preset-fat-tree");
    let bin = dir.join("fat_tree.bin");

    assert_success(&topo_tool(&[
        "preset",
        "fat-tree",
        "--k",
        "4",
        "--output",
        bin.to_str().unwrap(),
    ]));
    let output = topo_tool(&["inspect", "--input", bin.to_str().unwrap()]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.lines().next(),
        Some("nodes=36 hosts=16 switches=20 links=48")
    );
    assert!(!stdout.contains("unconnected"), "fat-tree has spare ports: {stdout}");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn encode_then_decode_preserves_json_descriptor() {
    let dir = unique_temp_dir("encode-decode");
    let json = write_file(&dir, "line.json", LINE_JSON.as_bytes());
    let bin = dir.join("line.bin");

    assert_success(&topo_tool(&[
        "encode",
        "--input",
        json.to_str().unwrap(),
        "--output",
        bin.to_str().unwrap(),
    ]));

    let output = topo_tool(&["decode", "--input", bin.to_str().unwrap()]);
    assert_success(&output);
    let decoded: Value = serde_json::from_slice(&output.stdout).expect("parse decoded json");
    let original: Value = serde_json::from_str(LINE_JSON).expect("parse original json");
    assert_eq!(decoded, original);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn encode_rejects_link_to_undeclared_node() {
    let dir = unique_temp_dir("encode-dangling");
    let json = write_file(
        &dir,
        "dangling.json",
        br#"{
            "nodes": [ { "id": 1, "role": "host", "port_count": 1 } ],
            "links": [ { "src_id": 1, "dst_id": 9, "capacity_gbps": 10.0, "latency_ns": 0 } ]
        }"#,
    );
    let bin = dir.join("dangling.bin");

    let output = topo_tool(&[
        "encode",
        "--input",
        json.to_str().unwrap(),
        "--output",
        bin.to_str().unwrap(),
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("undeclared node 9"),
        "unexpected stderr: {stderr}"
    );
    assert!(!bin.exists());

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn inspect_fails_on_garbage_input() {
    let dir = unique_temp_dir("inspect-garbage");
    let bin = write_file(&dir, "garbage.bin", b"definitely not a topology");

    let output = topo_tool(&["inspect", "--input", bin.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error: "), "unexpected stderr: {stderr}");

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn incast_on_dumbbell_is_lossless_with_default_pfc() {
    let dir = unique_temp_dir("incast");
    let bin = dir.join("dumbbell.bin");
    assert_success(&topo_tool(&["preset", "dumbbell", "--output", bin.to_str().unwrap()]));

    let output = topo_tool(&[
        "incast",
        "--input",
        bin.to_str().unwrap(),
        "--frames",
        "10",
        "--until-ms",
        "10",
    ]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout
        .lines()
        .find(|l| l.starts_with("delivered_frames="))
        .expect("stats line");

    // 三台发送主机各 10 帧
    assert_eq!(counter(line, "delivered_frames"), 30);
    assert_eq!(counter(line, "delivered_bytes"), 30 * 1500);
    assert_eq!(counter(line, "dropped_frames"), 0);
    assert_eq!(counter(line, "rejected_frames"), 0);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn incast_honours_build_options_file() {
    let dir = unique_temp_dir("incast-options");
    let json = write_file(&dir, "line.json", LINE_JSON.as_bytes());
    let bin = dir.join("line.bin");
    assert_success(&topo_tool(&[
        "encode",
        "--input",
        json.to_str().unwrap(),
        "--output",
        bin.to_str().unwrap(),
    ]));
    let options = write_file(
        &dir,
        "options.json",
        br#"{ "switch": { "default_port": { "pfc": { "pause_threshold": 100, "resume_threshold": 50, "hard_capacity": 7 } } } }"#,
    );

    let output = topo_tool(&[
        "incast",
        "--input",
        bin.to_str().unwrap(),
        "--options",
        options.to_str().unwrap(),
        "--frames",
        "5",
    ]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let line = stdout
        .lines()
        .find(|l| l.starts_with("delivered_frames="))
        .expect("stats line");
    assert_eq!(counter(line, "delivered_frames"), 5);
    assert_eq!(counter(line, "pause_frames_sent"), 0);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn incast_reports_ce_marks_only_for_ect_traffic() {
    let dir = unique_temp_dir("incast-ecn");
    let json = write_file(&dir, "line.json", LINE_JSON.as_bytes());
    let bin = dir.join("line.bin");
    assert_success(&topo_tool(&[
        "encode",
        "--input",
        json.to_str().unwrap(),
        "--output",
        bin.to_str().unwrap(),
    ]));
    // k_max 低于一帧的大小：每个 ECT 帧都会被标记
    let options = write_file(
        &dir,
        "options.json",
        br#"{ "switch": { "default_port": { "ecn": { "3": { "k_min_bytes": 0, "k_max_bytes": 1, "p_max": 0.0 } } } } }"#,
    );

    let stats = |extra: &[&str]| {
        let mut args = vec![
            "incast",
            "--input",
            bin.to_str().unwrap(),
            "--options",
            options.to_str().unwrap(),
            "--frames",
            "5",
        ];
        args.extend_from_slice(extra);
        let output = topo_tool(&args);
        assert_success(&output);
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .find(|l| l.starts_with("delivered_frames="))
            .expect("stats line")
            .to_string()
    };

    let line = stats(&["--ect"]);
    assert_eq!(counter(&line, "delivered_frames"), 5);
    assert_eq!(counter(&line, "delivered_ce_frames"), 5);

    let line = stats(&[]);
    assert_eq!(counter(&line, "delivered_frames"), 5);
    assert_eq!(counter(&line, "delivered_ce_frames"), 0);

    let _ = fs::remove_dir_all(&dir);
}
