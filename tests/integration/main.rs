//! Integration tests for the crucible binary
//!
//! These drive the compiled CLI end to end: data loading, catalog output and a
//! live server answering a search.

use std::io::Write;
use std::net::TcpListener;
use std::path::Path;
use std::process::{Child, Command, Output, Stdio};
use std::thread::sleep;
use std::time::Duration;

use tempfile::NamedTempFile;

const BIN: &str = env!("CARGO_BIN_EXE_crucible");

fn crucible(args: &[&str]) -> Output {
    Command::new(BIN)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run crucible")
}

fn data_file(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

fn sample_data() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/data/elements.json"))
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Kills the server when the test ends, pass or fail.
struct Server(Child);

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

#[test]
fn test_cli_help() {
    let output = crucible(&["--help"]);
    let text = stdout(&output);
    assert!(output.status.success());
    assert!(text.contains("crucible"));
    assert!(text.contains("search visualization"));
}

#[test]
fn test_version() {
    let output = crucible(&["version"]);
    assert!(stdout(&output).starts_with("Crucible v"));
}

#[test]
fn test_check_sample_data() {
    let data = sample_data().to_str().unwrap();
    let output = crucible(&["check", "--data", data]);
    assert!(output.status.success());

    let text = stdout(&output);
    // Swapped duplicates and the three-ingredient entry are dropped.
    assert!(text.starts_with("18 elements, 15 recipes"), "{}", text);
    assert!(text.contains("tier  5: 1"));
}

#[test]
fn test_check_rejects_cycles() {
    let file = data_file(
        r#"[
            {"name": "Air"}, {"name": "Fire"},
            {"name": "Smoke", "recipes": [["Ash", "Air"]]},
            {"name": "Ash", "recipes": [["Smoke", "Fire"]]}
        ]"#,
    );
    let output = crucible(&["check", "--data", file.path().to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cycle"), "{}", stderr);
}

#[test]
fn test_check_rejects_dangling_reference() {
    let file = data_file(r#"[{"name": "Air"}, {"name": "Storm", "recipes": [["Air", "Wind"]]}]"#);
    let output = crucible(&["check", "--data", file.path().to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Wind"));
}

#[test]
fn test_list_pages() {
    let data = sample_data().to_str().unwrap();
    let output = crucible(&[
        "list", "--data", data, "--category", "basic", "--page-size", "3", "--page", "2",
    ]);
    assert!(output.status.success());

    let text = stdout(&output);
    let lines: Vec<&str> = text.lines().collect();
    // Basic: Air, Earth, Fire, Unicorn, Water
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("Unicorn"));
    assert!(lines[1].starts_with("Water"));
    assert_eq!(lines[2], "page 2/2 (5 basic elements)");

    let output = crucible(&["list", "--data", data, "--category", "tier-99"]);
    assert_eq!(stdout(&output).trim(), "page 1/0 (0 tier-99 elements)");
}

#[test]
fn test_serve_and_search() {
    let port = free_port().to_string();
    let root = env!("CARGO_MANIFEST_DIR");
    let script = format!("scripted:{}/demos/engine-script.json", root);
    let child = Command::new(BIN)
        .args(["serve", "--port", &port, "--engine", &script])
        .args(["--data", sample_data().to_str().unwrap()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .expect("failed to start server");
    let _server = Server(child);

    let url = format!("ws://127.0.0.1:{}/ws", port);
    let mut output = None;
    for _ in 0..50 {
        let attempt = crucible(&["search", "Rain", "--url", &url, "--best"]);
        if attempt.status.success() {
            output = Some(attempt);
            break;
        }
        sleep(Duration::from_millis(100));
    }
    let output = output.expect("server never answered");
    let text = stdout(&output);
    assert!(text.contains("exploring Rain"));
    assert!(text.contains("tree 1:"));
    assert!(text.contains("        Water"));

    let failed = crucible(&["search", "Phoenix", "--url", &url, "--best"]);
    assert!(!failed.status.success());
    assert!(String::from_utf8_lossy(&failed.stderr).contains("ElementNotFound"));
}
