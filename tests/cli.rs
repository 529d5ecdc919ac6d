use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn sace_queue(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("sace-queue").unwrap();
    cmd.env("SACE_QUEUE_HOME", home.path())
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG");
    cmd
}

fn add(home: &TempDir, register: &str) -> String {
    let output = sace_queue(home)
        .args(["--output", "json", "add", "-"])
        .write_stdin(register)
        .output()
        .unwrap();
    assert!(output.status.success());

    let added: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    added["id"].as_str().unwrap().to_string()
}

#[test]
fn status_on_empty_queue() {
    let home = TempDir::new().unwrap();

    sace_queue(&home)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Pending:    0"));
}

#[test]
fn add_list_show_round() {
    let home = TempDir::new().unwrap();
    let id = add(&home, r#"{"imovel_numero": "12", "imovel_lado": "direito"}"#);

    sace_queue(&home)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains(&id))
        .stdout(predicate::str::contains("CREATE_REGISTER"));

    sace_queue(&home)
        .args(["--output", "json", "show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"imovel_lado\": \"direito\""));
}

#[test]
fn add_update_from_file() {
    let home = TempDir::new().unwrap();
    let register = home.path().join("visita.json");
    std::fs::write(&register, r#"{"imovel_numero": "7", "li": true}"#).unwrap();

    sace_queue(&home)
        .args(["add", "--update", "42"])
        .arg(&register)
        .assert()
        .success()
        .stdout(predicate::str::contains("Queued Update Register operation"));

    sace_queue(&home)
        .args(["--output", "json", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"count\": 1"));
}

#[test]
fn show_unknown_id_fails() {
    let home = TempDir::new().unwrap();

    sace_queue(&home)
        .args(["show", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not found"));
}

#[test]
fn clear_requires_force() {
    let home = TempDir::new().unwrap();
    add(&home, r#"{"imovel_numero": "1"}"#);

    sace_queue(&home)
        .arg("clear")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));

    sace_queue(&home)
        .args(["clear", "--force"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared 1 operations"));

    sace_queue(&home)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("No operations in queue."));
}

#[test]
fn invalid_config_is_reported() {
    let home = TempDir::new().unwrap();
    std::fs::write(home.path().join("config.yaml"), "queue:\n  max_retries: 0\n").unwrap();

    sace_queue(&home)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_retries"));
}

#[test]
fn completions_generate() {
    let home = TempDir::new().unwrap();

    sace_queue(&home)
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sace-queue"));
}

#[test]
fn watch_prints_current_state() {
    let home = TempDir::new().unwrap();
    std::fs::write(
        home.path().join("config.yaml"),
        "connectivity:\n  probe_address: \"127.0.0.1:1\"\n  probe_timeout_ms: 300\n",
    )
    .unwrap();
    add(&home, r#"{"imovel_numero": "3"}"#);

    sace_queue(&home)
        .args(["--output", "json", "watch", "--changes", "0"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"online\":false"))
        .stdout(predicate::str::contains("\"pending\":1"));
}
