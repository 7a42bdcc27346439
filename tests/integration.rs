//! Integration tests for the non-interactive supercontacts commands

use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::PathBuf;
use std::thread;

use assert_cmd::Command as AssertCommand;
use predicates::prelude::*;
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

const SEED: &str = r#"
[[contacts]]
name = "Ana Souza"
phone = "123456789"
favorite = true

[[contacts]]
name = "Bob"
phone = "987654321"

[[contacts]]
name = "Carla"
phone = "555000111"
isFavorite = false
"#;

/// Isolated config, seed file and log directory
struct TestEnv {
    temp_dir: TempDir,
    config_path: PathBuf,
}

impl TestEnv {
    fn new() -> Self {
        Self::with_joke_endpoint("http://127.0.0.1:9/")
    }

    fn with_joke_endpoint(endpoint: &str) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let contacts_path = temp_dir.path().join("contacts.toml");
        let log_dir = temp_dir.path().join("logs");
        let config_path = temp_dir.path().join("config.toml");

        fs::write(&contacts_path, SEED).unwrap();
        let config = format!(
            "contacts = \"{}\"\n\n[joke]\nendpoint = \"{}\"\ntimeout_secs = 5\n\n[log]\nlevel = \"debug\"\ndir = \"{}\"\n",
            toml_path(&contacts_path),
            endpoint,
            toml_path(&log_dir),
        );
        fs::write(&config_path, config).unwrap();

        Self {
            temp_dir,
            config_path,
        }
    }

    fn cmd(&self) -> AssertCommand {
        let mut cmd = supercontacts_cmd();
        cmd.arg("--config").arg(&self.config_path);
        cmd
    }

    fn log_dir(&self) -> PathBuf {
        self.temp_dir.path().join("logs")
    }
}

fn toml_path(path: &std::path::Path) -> String {
    path.display().to_string().replace('\\', "\\\\")
}

fn supercontacts_cmd() -> AssertCommand {
    AssertCommand::cargo_bin("supercontacts").unwrap()
}

/// Answer a single HTTP request with the given status and body.
fn serve_once(status: &'static str, body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        if let Ok((mut stream, _)) = listener.accept() {
            let mut buf = [0u8; 2048];
            let _ = stream.read(&mut buf);
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = stream.write_all(response.as_bytes());
        }
    });
    format!("http://{}/jokes/random", addr)
}

// =============================================================================
// list
// =============================================================================

#[test]
fn test_list_prints_all_contacts() {
    let env = TestEnv::new();
    env.cmd()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("3 contact(s)\n"))
        .stdout(predicate::str::contains("123456789\tAna Souza\t*"))
        .stdout(predicate::str::contains("987654321\tBob\t-"))
        .stdout(predicate::str::contains("555000111\tCarla\t-"));

    assert!(env.log_dir().exists());
}

#[test]
fn test_list_filters_by_name_and_phone() {
    let env = TestEnv::new();
    env.cmd()
        .args(["list", "bo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 1 contact(s) matching \"bo\""))
        .stdout(predicate::str::contains("Bob"))
        .stdout(predicate::str::contains("Carla").not());

    env.cmd()
        .args(["list", "0001"])
        .assert()
        .success()
        .stdout(predicate::str::contains("555000111\tCarla"));

    env.cmd()
        .args(["list", "nobody"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No matches for \"nobody\""));
}

#[test]
fn test_contacts_flag_overrides_config() {
    let env = TestEnv::new();
    let other = env.temp_dir.path().join("other.toml");
    fs::write(
        &other,
        "[[contacts]]\nname = \"Dora\"\nphone = \"111222333\"\n",
    )
    .unwrap();

    env.cmd()
        .arg("--contacts")
        .arg(&other)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 contact(s)"))
        .stdout(predicate::str::contains("Dora"))
        .stdout(predicate::str::contains("Bob").not());
}

// =============================================================================
// check-phone
// =============================================================================

#[test]
fn test_check_phone_outcomes() {
    let env = TestEnv::new();
    env.cmd()
        .args(["check-phone", "111111111"])
        .assert()
        .success()
        .stdout("valid\n");

    env.cmd()
        .args(["check-phone", "12345"])
        .assert()
        .success()
        .stdout("invalid: malformed\n");

    env.cmd()
        .args(["check-phone", "12345678a"])
        .assert()
        .success()
        .stdout("invalid: malformed\n");

    env.cmd()
        .args(["check-phone", "987654321"])
        .assert()
        .success()
        .stdout("invalid: duplicate\n");
}

// =============================================================================
// joke
// =============================================================================

#[test]
fn test_joke_prints_value() {
    let endpoint = serve_once("200 OK", r#"{"id":"x","value":"Chuck counted to infinity. Twice."}"#);
    let env = TestEnv::with_joke_endpoint(&endpoint);
    env.cmd()
        .arg("joke")
        .assert()
        .success()
        .stdout("Chuck counted to infinity. Twice.\n");
}

#[test]
fn test_joke_failure_is_an_error() {
    let endpoint = serve_once("500 Internal Server Error", "{}");
    let env = TestEnv::with_joke_endpoint(&endpoint);
    env.cmd().arg("joke").assert().failure();
}

// =============================================================================
// Configuration errors
// =============================================================================

#[test]
fn test_missing_explicit_config_fails() {
    let temp_dir = TempDir::new().unwrap();
    supercontacts_cmd()
        .arg("--config")
        .arg(temp_dir.path().join("absent.toml"))
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn test_unknown_config_key_warns() {
    let env = TestEnv::new();
    let mut raw = fs::read_to_string(&env.config_path).unwrap();
    raw.push_str("\n[form]\nclear_on_submit = true\nbogus = 1\n");
    fs::write(&env.config_path, raw).unwrap();

    env.cmd()
        .arg("list")
        .assert()
        .success()
        .stderr(predicate::str::contains("warning:"))
        .stderr(predicate::str::contains("bogus"));
}

#[test]
fn test_key_collision_is_rejected() {
    let env = TestEnv::new();
    let mut raw = fs::read_to_string(&env.config_path).unwrap();
    raw.push_str("\n[keys.table]\nquit = \"a\"\nadd = \"a\"\n");
    fs::write(&env.config_path, raw).unwrap();

    env.cmd().arg("list").assert().failure();
}
