use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Command running in an empty directory with no user configuration
fn waymark(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("waymark").unwrap();
    cmd.current_dir(dir.path())
        .env("XDG_CONFIG_HOME", dir.path().join("xdg"))
        .env_remove("WAYMARK_CONFIG");
    cmd
}

#[test]
fn go_with_demo_map_trims_default_child() {
    let dir = TempDir::new().unwrap();
    waymark(&dir)
        .args(["go", "/book/ch2", "/book"])
        .assert()
        .success()
        .stdout(predicate::str::contains("/book/ch2: changed"))
        .stdout(predicate::str::contains("state: root=book chapter=ch1"))
        .stdout(predicate::str::contains("url: /book\n"))
        .stdout(predicate::str::contains("title: Chapter 1 | Book"));
}

#[test]
fn go_to_unknown_state_fails() {
    let dir = TempDir::new().unwrap();
    waymark(&dir)
        .args(["go", "/nowhere"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("State 'nowhere' not found"));
}

#[test]
fn route_map_in_working_directory_is_used() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("waymark.json"),
        r#"{
            "navigator": { "base_url": "/docs", "adapter": "query" },
            "router": { "default": "intro", "states": [{ "id": "intro" }, { "id": "faq" }] }
        }"#,
    )
    .unwrap();

    waymark(&dir)
        .args(["go", "/faq"])
        .assert()
        .success()
        .stdout(predicate::str::contains("url: /docs?root=faq"));
}

#[test]
fn sync_reports_canonical_url() {
    let dir = TempDir::new().unwrap();
    waymark(&dir)
        .args(["sync", "/book/ch1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("state: root=book chapter=ch1"))
        .stdout(predicate::str::contains("canonical: /book"));
}

#[test]
fn encode_then_decode_bookmark() {
    let dir = TempDir::new().unwrap();
    let output = waymark(&dir)
        .args(["encode", r#"{"page":3}"#])
        .output()
        .unwrap();
    assert!(output.status.success());
    let param = String::from_utf8(output.stdout).unwrap();
    assert!(param.starts_with("_state="));

    waymark(&dir)
        .args(["decode", param.trim()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"page\": 3"));
}

#[test]
fn shell_session_navigates_back() {
    let dir = TempDir::new().unwrap();
    waymark(&dir)
        .arg("shell")
        .write_stdin("go /book/ch3\ngo /tables\nback\njump\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("state: root=book chapter=ch3").count(2))
        .stdout(predicate::str::contains("state: root=tables"))
        .stdout(predicate::str::contains("error: unknown command 'jump'"));
}

#[test]
fn tree_json_lists_routers() {
    let dir = TempDir::new().unwrap();
    waymark(&dir)
        .args(["tree", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"name\": \"chapter\""));
}
