use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn mds_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("mds");
    path
}

const TREE_JSON: &str = r#"[
  {
    "number": "600",
    "name": "Technology",
    "children": [
      {
        "number": "630",
        "name": "Agriculture",
        "children": [
          { "number": "636", "name": "Animal husbandry", "children": [] }
        ]
      }
    ]
  },
  { "number": "500", "name": "Science" }
]"#;

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let data_dir = root.join("data");
    fs::create_dir_all(&data_dir).unwrap();
    fs::write(data_dir.join("mds.json"), TREE_JSON).unwrap();

    let config_content = format!(
        r#"[tree]
path = "{}/data/mds.json"
snapshot_path = "{}/data/mds-temp.json"

[oracle]
provider = "disabled"
"#,
        root.display(),
        root.display()
    );

    let config_path = config_dir.join("mds.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_mds(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = mds_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run mds binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_stats() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_mds(&config_path, &["stats"]);
    assert!(success, "stats failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Nodes:       4"));
    assert!(stdout.contains("Leaves:      2"));
    assert!(stdout.contains("Depth:       3"));
    assert!(stdout.contains("Invariants:  ok"));
}

#[test]
fn test_stats_reports_misplaced_children() {
    let (tmp, config_path) = setup_test_env();
    fs::write(
        tmp.path().join("data").join("mds.json"),
        r#"[{ "number": "600", "name": "Technology", "children": [{ "number": "530", "name": "Physics" }] }]"#,
    )
    .unwrap();

    let (stdout, _, success) = run_mds(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("530 is not an extension of 600"));
}

#[test]
fn test_documents_to_stdout() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_mds(&config_path, &["documents"]);
    assert!(success, "documents failed: stdout={}, stderr={}", stdout, stderr);

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 4);

    let husbandry: serde_json::Value = serde_json::from_str(lines[2]).unwrap();
    assert_eq!(husbandry["number"], "636");
    assert_eq!(husbandry["breadcrumb"], "Technology > Agriculture > Animal husbandry");
    assert_eq!(husbandry["level"], 2);
}

#[test]
fn test_documents_to_file() {
    let (tmp, config_path) = setup_test_env();
    let out = tmp.path().join("docs.jsonl");

    let (stdout, stderr, success) =
        run_mds(&config_path, &["documents", "--output", out.to_str().unwrap()]);
    assert!(success, "documents failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Wrote 4 documents"));
    assert_eq!(fs::read_to_string(&out).unwrap().lines().count(), 4);
}

#[test]
fn test_classify_with_disabled_oracle_fails() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_mds(&config_path, &["classify", "dog breeding"]);
    assert!(!success, "classify should fail without an oracle");
    assert!(stdout.is_empty());
    assert!(stderr.contains("disabled"), "stderr={}", stderr);
}

#[test]
fn test_classify_checks_oracle_before_loading_tree() {
    let (tmp, config_path) = setup_test_env();
    fs::remove_file(tmp.path().join("data").join("mds.json")).unwrap();

    let (_, stderr, success) = run_mds(&config_path, &["classify", "dog breeding"]);
    assert!(!success);
    assert!(stderr.contains("Oracle provider is disabled"), "stderr={}", stderr);
    assert!(!stderr.contains("Failed to read taxonomy file"), "stderr={}", stderr);
}

#[test]
fn test_classify_rejects_blank_query() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_mds(&config_path, &["classify", "   "]);
    assert!(!success);
    assert!(stderr.contains("query must be"), "stderr={}", stderr);
}

#[test]
fn test_classify_rejects_long_query() {
    let (_tmp, config_path) = setup_test_env();
    let query = "a".repeat(501);

    let (_, stderr, success) = run_mds(&config_path, &["classify", &query]);
    assert!(!success);
    assert!(stderr.contains("query must be"), "stderr={}", stderr);
}

#[test]
fn test_missing_tree_fails() {
    let (tmp, config_path) = setup_test_env();
    fs::remove_file(tmp.path().join("data").join("mds.json")).unwrap();

    let (_, stderr, success) = run_mds(&config_path, &["stats"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read taxonomy file"), "stderr={}", stderr);
}

#[test]
fn test_invalid_config_rejected() {
    let (_tmp, config_path) = setup_test_env();
    fs::write(&config_path, "[crawler]\nconcurrency = 0\n").unwrap();

    let (_, stderr, success) = run_mds(&config_path, &["stats"]);
    assert!(!success);
    assert!(stderr.contains("crawler.concurrency"), "stderr={}", stderr);
}

#[test]
fn test_completions() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_mds(&config_path, &["completions", "bash"]);
    assert!(success);
    assert!(stdout.contains("mds"));
}
