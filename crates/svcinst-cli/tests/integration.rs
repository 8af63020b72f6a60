#![cfg(unix)]
#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use tempfile::TempDir;

// Fake `service`: records calls and keeps run state as marker files.
const FAKE_SERVICE: &str = r#"#!/bin/sh
dir="$(dirname "$0")"
echo "service $*" >> "$dir/calls.log"
case "$2" in
  status) [ -f "$dir/running-$1" ] ;;
  start|restart) touch "$dir/running-$1" ;;
  stop) rm -f "$dir/running-$1" ;;
esac
"#;

// Fake `chkconfig`: boot enablement is a marker file.
const FAKE_CHKCONFIG: &str = r#"#!/bin/sh
dir="$(dirname "$0")"
echo "chkconfig $*" >> "$dir/calls.log"
case "$1" in
  --list)
    if [ -f "$dir/enabled-$2" ]; then
      echo "$2 0:off 1:off 2:on 3:on 4:on 5:on 6:off"
    else
      echo "$2 0:off 1:off 2:off 3:off 4:off 5:off 6:off"
    fi ;;
  --add|--del) ;;
  *)
    if [ "$2" = on ]; then touch "$dir/enabled-$1"; else rm -f "$dir/enabled-$1"; fi ;;
esac
"#;

fn write_script(path: &Path, body: &str) {
    std::fs::write(path, body).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

/// A temp dir holding fake init tools, a config pointing at them, and a
/// state database location.
fn host() -> TempDir {
    let dir = TempDir::new().unwrap();
    let bin = dir.path().join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    write_script(&bin.join("service"), FAKE_SERVICE);
    write_script(&bin.join("chkconfig"), FAKE_CHKCONFIG);

    let config = format!(
        "state_db: {}\nservice_command: {}\nchkconfig_command: {}\n",
        dir.path().join("state/sysrestore.redb").display(),
        bin.join("service").display(),
        bin.join("chkconfig").display(),
    );
    std::fs::write(dir.path().join("svcinst.yaml"), config).unwrap();
    dir
}

fn svcinst(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("svcinst").unwrap();
    cmd.current_dir(dir.path())
        .env("SVCINST_CONFIG", dir.path().join("svcinst.yaml"))
        .env_remove("SVCINST_STATE_DB")
        .env_remove("RUST_LOG");
    cmd
}

fn calls(dir: &TempDir) -> Vec<String> {
    std::fs::read_to_string(dir.path().join("bin/calls.log"))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

fn mark(dir: &TempDir, name: &str) {
    std::fs::write(dir.path().join("bin").join(name), "").unwrap();
}

// ---------------------------------------------------------------------------
// svcinst order
// ---------------------------------------------------------------------------

#[test]
fn order_prints_fixed_table() {
    let dir = host();
    svcinst(&dir)
        .arg("order")
        .assert()
        .success()
        .stdout(predicate::str::contains("KDC"))
        .stdout(predicate::str::contains("krb5kdc"))
        .stdout(predicate::str::contains("50"));
}

#[test]
fn order_json() {
    let dir = host();
    let out = svcinst(&dir)
        .args(["order", "--json"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let names: Vec<&str> = v
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["KDC", "KPASSWD", "DNS", "HTTP", "CA"]);
    assert_eq!(v[3]["start_order"], 40);
}

// ---------------------------------------------------------------------------
// svcinst install / uninstall
// ---------------------------------------------------------------------------

#[test]
fn install_prints_progress_and_records_state() {
    let dir = host();
    svcinst(&dir)
        .args(["install", "httpd"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuring httpd"))
        .stdout(predicate::str::contains("  [1/2]: starting httpd"))
        .stdout(predicate::str::contains(
            "  [2/2]: configuring httpd to start on boot",
        ))
        .stdout(predicate::str::contains("done configuring httpd."));

    assert!(dir.path().join("bin/running-httpd").exists());
    assert!(dir.path().join("bin/enabled-httpd").exists());

    svcinst(&dir)
        .args(["state", "show", "httpd"])
        .assert()
        .success()
        .stdout(predicate::str::contains("running"))
        .stdout(predicate::str::contains("enabled"))
        .stdout(predicate::str::contains("false"));
}

#[test]
fn install_then_uninstall_restores_host() {
    let dir = host();
    svcinst(&dir).args(["install", "httpd"]).assert().success();
    svcinst(&dir)
        .args(["uninstall", "httpd"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Unconfiguring httpd"))
        .stdout(predicate::str::contains("Stopped httpd."));

    assert!(!dir.path().join("bin/running-httpd").exists());
    assert!(!dir.path().join("bin/enabled-httpd").exists());
    assert!(calls(&dir).contains(&"chkconfig --del httpd".to_string()));

    svcinst(&dir)
        .args(["state", "show", "httpd"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No state recorded for httpd."));
}

#[test]
fn uninstall_keeps_service_that_was_already_up() {
    let dir = host();
    mark(&dir, "running-named");
    mark(&dir, "enabled-named");

    svcinst(&dir).args(["install", "named"]).assert().success();
    svcinst(&dir)
        .args(["uninstall", "named"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to undo for named."));

    assert!(dir.path().join("bin/running-named").exists());
    assert!(dir.path().join("bin/enabled-named").exists());
    assert!(!calls(&dir).iter().any(|c| c == "service named stop"));
}

#[test]
fn uninstall_without_install_is_noop() {
    let dir = host();
    let out = svcinst(&dir)
        .args(["uninstall", "httpd", "--json"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["service"], "httpd");
    assert_eq!(v["stopped"], false);
    assert_eq!(v["disabled"], false);
    assert!(calls(&dir).is_empty());
}

#[test]
fn install_failure_reports_step() {
    let dir = host();
    write_script(&dir.path().join("bin/service"), "#!/bin/sh\necho boom >&2\nexit 1\n");

    svcinst(&dir)
        .args(["install", "httpd"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error: failed to install httpd"))
        .stderr(predicate::str::contains("[1/2]"));
}

#[test]
fn install_json_keeps_stdout_parseable() {
    let dir = host();
    let out = svcinst(&dir)
        .args(["install", "httpd", "--json"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["installed"], true);
    assert!(String::from_utf8_lossy(&out.stderr).contains("done configuring httpd."));
}

#[test]
fn invalid_service_name_is_rejected() {
    let dir = host();
    svcinst(&dir)
        .args(["install", "../etc/passwd"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid service name"));
    assert!(calls(&dir).is_empty());
}

// ---------------------------------------------------------------------------
// svcinst status
// ---------------------------------------------------------------------------

#[test]
fn status_reports_live_and_recorded_state() {
    let dir = host();
    svcinst(&dir).args(["install", "httpd"]).assert().success();

    let out = svcinst(&dir)
        .args(["status", "httpd", "--json"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["running"], true);
    assert_eq!(v["enabled"], true);
    assert_eq!(v["configured"], true);
    assert_eq!(v["was_running"], false);
}

// ---------------------------------------------------------------------------
// svcinst state
// ---------------------------------------------------------------------------

#[test]
fn state_show_empty_db() {
    let dir = host();
    svcinst(&dir)
        .args(["state", "show", "httpd"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No state recorded for httpd."));
}

#[test]
fn state_clear_forgets_one_key() {
    let dir = host();
    svcinst(&dir).args(["install", "httpd"]).assert().success();

    svcinst(&dir)
        .args(["state", "clear", "httpd", "running"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared httpd/running."));
    svcinst(&dir)
        .args(["state", "clear", "httpd", "running"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No value recorded"));

    let out = svcinst(&dir)
        .args(["state", "show", "httpd", "--json"])
        .output()
        .unwrap();
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    let keys: Vec<&str> = v["entries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, ["enabled"]);
}

#[test]
fn state_db_flag_overrides_config() {
    let dir = host();
    let other = dir.path().join("other.redb");
    svcinst(&dir)
        .args(["install", "httpd", "--state-db"])
        .arg(&other)
        .assert()
        .success();
    assert!(other.exists());
    svcinst(&dir)
        .args(["state", "show", "httpd"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No state recorded"));
}

// ---------------------------------------------------------------------------
// svcinst config
// ---------------------------------------------------------------------------

#[test]
fn config_validate_clean() {
    let dir = host();
    svcinst(&dir)
        .args(["config", "validate"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Config is valid"));
}

#[test]
fn config_validate_reports_errors() {
    let dir = host();
    std::fs::write(
        dir.path().join("svcinst.yaml"),
        "host:\n  fqdn: ipa.example.com\n",
    )
    .unwrap();
    svcinst(&dir)
        .args(["config", "validate"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("[error] host.fqdn is set"));
}

#[test]
fn missing_config_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let mut cmd = Command::cargo_bin("svcinst").unwrap();
    cmd.current_dir(dir.path())
        .env("SVCINST_CONFIG", dir.path().join("absent.yaml"))
        .args(["config", "show", "--json"]);
    let out = cmd.output().unwrap();
    assert!(out.status.success());
    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["state_db"], "/var/lib/svcinst/sysrestore.redb");
    assert_eq!(v["directory"]["host"], "127.0.0.1");
}
