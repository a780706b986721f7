use std::fs;
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn fsearch_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("fsearch");
    path
}

const SCENARIO: &str = r#"[
    {"doc_id": "d1", "text": "python programming language"},
    {"doc_id": "d2", "text": "python web development"},
    {"doc_id": "d3", "text": "java programming language"}
]"#;

fn setup_test_env_with_bind(bind: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let files_dir = root.join("files");
    fs::create_dir_all(&files_dir).unwrap();
    fs::write(files_dir.join("alpha.md"), "Rust programming with cargo and crates").unwrap();
    fs::write(files_dir.join("beta.md"), "Python machine learning with PyTorch").unwrap();
    fs::write(files_dir.join("gamma.txt"), "Rust programming for deployment tooling").unwrap();

    fs::write(root.join("docs.json"), SCENARIO).unwrap();

    let config_content = format!(
        r#"[db]
path = "{root}/data/fsearch.sqlite"

[index]
name = "fractal_search"

[partition]
max_documents = 1

[search]
default_limit = 10

[server]
bind = "{bind}"

[sources.filesystem]
root = "{root}/files"
include_globs = ["**/*.md", "**/*.txt"]
exclude_globs = []
follow_symlinks = false
"#,
        root = root.display(),
        bind = bind,
    );

    let config_path = config_dir.join("fsearch.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn setup_test_env() -> (TempDir, PathBuf) {
    setup_test_env_with_bind("127.0.0.1:5000")
}

fn run_fsearch(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = fsearch_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("Failed to run fsearch binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

fn docs_path(config_path: &Path) -> String {
    config_path
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("docs.json")
        .to_string_lossy()
        .to_string()
}

/// Line for `id` in the `ID  LABEL` table.
fn label_of(stdout: &str, id: &str) -> Option<String> {
    stdout.lines().find_map(|line| {
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some(first), Some(label)) if first == id => Some(label.to_string()),
            _ => None,
        }
    })
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_fsearch(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_fsearch(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_fsearch(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_label_prints_mapping_without_writing() {
    let (tmp, config_path) = setup_test_env();
    let docs = docs_path(&config_path);

    let (stdout, stderr, success) = run_fsearch(&config_path, &["label", &docs]);
    assert!(success, "label failed: stdout={}, stderr={}", stdout, stderr);
    assert_eq!(label_of(&stdout, "d1").as_deref(), Some("root.0.0"));
    assert_eq!(label_of(&stdout, "d3").as_deref(), Some("root.0.1"));
    assert_eq!(label_of(&stdout, "d2").as_deref(), Some("root.1"));

    assert!(!tmp.path().join("data/fsearch.sqlite").exists());
}

#[test]
fn test_label_json_output() {
    let (_tmp, config_path) = setup_test_env();
    let docs = docs_path(&config_path);

    let (stdout, _, success) = run_fsearch(
        &config_path,
        &["label", &docs, "--json", "--max-documents", "2"],
    );
    assert!(success);

    let mapping: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(mapping["d1"], "root.0");
    assert_eq!(mapping["d3"], "root.0");
    assert_eq!(mapping["d2"], "root.1");
}

#[test]
fn test_label_without_config_file() {
    let (tmp, config_path) = setup_test_env();
    let docs = docs_path(&config_path);
    let missing = tmp.path().join("config/missing.toml");

    let (stdout, stderr, success) = run_fsearch(&missing, &["label", &docs, "--json"]);
    assert!(success, "label failed: stdout={}, stderr={}", stdout, stderr);
    // Default max_documents = 2.
    let mapping: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(mapping["d2"], "root.1");
}

#[test]
fn test_label_rejects_duplicate_ids() {
    let (tmp, config_path) = setup_test_env();
    let dup = tmp.path().join("dup.json");
    fs::write(
        &dup,
        r#"[{"doc_id": "d1", "text": "a"}, {"doc_id": "d1", "text": "b"}]"#,
    )
    .unwrap();

    let (_, stderr, success) = run_fsearch(&config_path, &["label", dup.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("duplicate"), "stderr={}", stderr);
}

#[test]
fn test_index_and_search_with_label_filter() {
    let (_tmp, config_path) = setup_test_env();
    let docs = docs_path(&config_path);

    let (stdout, stderr, success) = run_fsearch(&config_path, &["index", &docs]);
    assert!(success, "index failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("indexed documents: 3 into 3 labels"));
    assert_eq!(label_of(&stdout, "d1").as_deref(), Some("root.0.0"));

    let (stdout, _, success) = run_fsearch(&config_path, &["search", "python"]);
    assert!(success);
    assert!(stdout.contains("d1"));
    assert!(stdout.contains("d2"));

    let (stdout, _, success) =
        run_fsearch(&config_path, &["search", "python", "--label", "root.1"]);
    assert!(success);
    assert!(stdout.contains("d2 (root.1)"));
    assert!(!stdout.contains("d1"));
}

#[test]
fn test_search_label_with_no_members() {
    let (_tmp, config_path) = setup_test_env();
    let docs = docs_path(&config_path);
    run_fsearch(&config_path, &["index", &docs]);

    let (stdout, _, success) =
        run_fsearch(&config_path, &["search", "python", "--label", "root.2"]);
    assert!(success);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_reindex_replaces_labels() {
    let (_tmp, config_path) = setup_test_env();
    let docs = docs_path(&config_path);
    run_fsearch(&config_path, &["index", &docs]);
    run_fsearch(&config_path, &["index", &docs, "--max-documents", "3"]);

    let (stdout, _, success) = run_fsearch(&config_path, &["get", "d1"]);
    assert!(success);
    assert!(stdout.contains("label: root\n"), "stdout={}", stdout);
}

#[test]
fn test_add_and_get() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_fsearch(
        &config_path,
        &["add", "note1", "Kubernetes rollout notes", "--label", "ops"],
    );
    assert!(success, "add failed: stdout={}, stderr={}", stdout, stderr);

    let (stdout, _, success) = run_fsearch(&config_path, &["get", "note1"]);
    assert!(success);
    assert!(stdout.contains("label: ops"));
    assert!(stdout.contains("Kubernetes rollout notes"));
}

#[test]
fn test_get_missing_document() {
    let (_tmp, config_path) = setup_test_env();
    run_fsearch(&config_path, &["init"]);

    let (_, stderr, success) = run_fsearch(&config_path, &["get", "nope"]);
    assert!(!success);
    assert!(stderr.contains("document not found"));
}

#[test]
fn test_index_filesystem_source() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_fsearch(&config_path, &["index", "--filesystem"]);
    assert!(success, "index failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("indexed documents: 3"));
    assert!(label_of(&stdout, "alpha.md").is_some());
    assert!(label_of(&stdout, "gamma.txt").is_some());

    let (stdout, _, success) = run_fsearch(&config_path, &["stats"]);
    assert!(success);
    assert!(stdout.contains("Documents:   3"));
}

// ============ HTTP server ============

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

struct ServerGuard(Child);

impl Drop for ServerGuard {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

fn start_server(config_path: &Path, base: &str) -> ServerGuard {
    let child = Command::new(fsearch_binary())
        .arg("--config")
        .arg(config_path)
        .arg("serve")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    let guard = ServerGuard(child);

    let client = reqwest::blocking::Client::new();
    let deadline = Instant::now() + Duration::from_secs(15);
    loop {
        if let Ok(resp) = client.get(format!("{}/health", base)).send() {
            if resp.status().is_success() {
                break;
            }
        }
        assert!(Instant::now() < deadline, "server did not start");
        std::thread::sleep(Duration::from_millis(100));
    }
    guard
}

#[test]
fn test_server_bulk_index_and_search() {
    let port = free_port();
    let bind = format!("127.0.0.1:{}", port);
    let base = format!("http://{}", bind);
    let (_tmp, config_path) = setup_test_env_with_bind(&bind);
    let _server = start_server(&config_path, &base);
    let client = reqwest::blocking::Client::new();

    let health: serde_json::Value = client
        .get(format!("{}/health", base))
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(health["status"], "ok");

    let body: serde_json::Value = serde_json::from_str(SCENARIO).unwrap();
    let resp = client
        .post(format!("{}/bulk_index", base))
        .json(&body)
        .send()
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);
    let created: serde_json::Value = resp.json().unwrap();
    assert_eq!(created["labels"]["d1"], "root.0.0");
    assert_eq!(created["labels"]["d2"], "root.1");

    let results: serde_json::Value = client
        .get(format!("{}/search", base))
        .query(&[("query", "programming"), ("cluster", "root.0.1")])
        .send()
        .unwrap()
        .json()
        .unwrap();
    let results = results["results"].as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["doc_id"], "d3");
    assert_eq!(results[0]["cluster"], "root.0.1");
    assert_eq!(results[0]["text"], "java programming language");

    let resp = client
        .post(format!("{}/index", base))
        .json(&serde_json::json!({"doc_id": "d4", "text": "Test document"}))
        .send()
        .unwrap();
    assert_eq!(resp.status().as_u16(), 201);

    let resp = client
        .post(format!("{}/index", base))
        .json(&serde_json::json!({"doc_id": "d5"}))
        .send()
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let err: serde_json::Value = resp.json().unwrap();
    assert_eq!(err["error"]["code"], "bad_request");

    let resp = client
        .post(format!("{}/bulk_index", base))
        .json(&serde_json::json!({"doc_id": "d6", "text": "x"}))
        .send()
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let resp = client.get(format!("{}/search", base)).send().unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}
