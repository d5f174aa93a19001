use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const LISTING: &str = include_str!("fixtures/listing.html");

fn lwatch_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("lwatch");
    path
}

fn write_config(root: &Path, source_url: &str, models: &str) -> PathBuf {
    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[db]
path = "{}/data/lwatch.sqlite"

[source]
url = "{}"
base_url = "https://dealer.example"

[filter]
min_year = 2020
models = {}

[http]
fetch_timeout_secs = 5

[telegram]
token_env = "LWATCH_TEST_TOKEN_UNSET"
"#,
        root.display(),
        source_url,
        models
    );

    let config_path = config_dir.join("lwatch.toml");
    fs::write(&config_path, config_content).unwrap();
    config_path
}

fn setup_test_env(source_url: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(tmp.path(), source_url, r#"["CX-5", "CX-30"]"#);
    (tmp, config_path)
}

fn run_lwatch(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = lwatch_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run lwatch binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

/// Serve the fixture page on an ephemeral local port from a background thread.
fn serve_fixture() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    std_listener.set_nonblocking(true).unwrap();
    let addr = std_listener.local_addr().unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            let app = axum::Router::new().route(
                "/ua/used-cars/",
                axum::routing::get(|| async { axum::response::Html(LISTING) }),
            );
            axum::serve(listener, app).await.unwrap();
        });
    });

    format!("http://{}/ua/used-cars/", addr)
}

#[test]
fn test_init_creates_database() {
    let (_tmp, config_path) = setup_test_env("https://dealer.example/ua/used-cars/");

    let (stdout, stderr, success) = run_lwatch(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env("https://dealer.example/ua/used-cars/");

    let (_, _, success1) = run_lwatch(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_lwatch(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_list_and_subscribers_on_empty_db() {
    let (_tmp, config_path) = setup_test_env("https://dealer.example/ua/used-cars/");
    run_lwatch(&config_path, &["init"]);

    let (stdout, stderr, success) = run_lwatch(&config_path, &["list"]);
    assert!(success, "list failed: {}", stderr);
    assert!(stdout.contains("No listings stored yet."));

    let (stdout, stderr, success) = run_lwatch(&config_path, &["subscribers"]);
    assert!(success, "subscribers failed: {}", stderr);
    assert!(stdout.contains("0 subscribers"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let config_path = write_config(tmp.path(), "https://dealer.example/", "[]");

    let (_, stderr, success) = run_lwatch(&config_path, &["init"]);
    assert!(!success);
    assert!(stderr.contains("filter.models"), "stderr={}", stderr);
}

#[test]
fn test_check_dry_run_reports_matching_listing_without_writing() {
    let url = serve_fixture();
    let (_tmp, config_path) = setup_test_env(&url);
    run_lwatch(&config_path, &["init"]);

    let (stdout, stderr, success) = run_lwatch(&config_path, &["check", "--dry-run"]);
    assert!(success, "check failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("candidates: 1"), "stdout={}", stdout);
    assert!(stdout.contains("new: 1"));
    assert!(stdout.contains("mazda-cx-5-4821"));
    assert!(stdout.contains("https://dealer.example/ua/used-cars/mazda-cx-5-4821"));

    let (stdout, _, _) = run_lwatch(&config_path, &["list"]);
    assert!(stdout.contains("No listings stored yet."));
}

#[test]
fn test_check_without_token_fails_cleanly() {
    let (_tmp, config_path) = setup_test_env("https://dealer.example/ua/used-cars/");
    let (_, stderr, success) = run_lwatch(&config_path, &["check"]);
    assert!(!success);
    assert!(stderr.contains("LWATCH_TEST_TOKEN_UNSET"), "stderr={}", stderr);
}
