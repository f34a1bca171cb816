use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::{json, Value};
use std::path::Path;
use tempfile::TempDir;

fn racha(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("racha").expect("racha binary");
    cmd.current_dir(dir.path())
        .env_remove("RACHA_CONFIG")
        .env_remove("RACHA_LEDGER_PATH")
        .env_remove("RACHA_DEBOUNCE_MS")
        .env("RUST_LOG", "warn");
    cmd
}

fn message(sender: &str, name: &str, is_admin: bool, body: &str) -> String {
    json!({
        "id": body,
        "chat": {
            "id": "G1",
            "isGroup": true,
            "participants": [
                {"id": sender, "isAdmin": is_admin, "contact": {"id": sender, "pushname": name}},
                {"id": "5511999990000@c.us", "isAdmin": false},
            ],
        },
        "sender": {"id": sender, "pushname": name},
        "body": body,
    })
    .to_string()
}

fn read_ledger(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).expect("ledger file")).expect("ledger json")
}

#[test]
fn serve_answers_and_persists() {
    let dir = TempDir::new().unwrap();
    let ledger = dir.path().join("data").join("payments.json");
    let input = [
        message("bruno@c.us", "Bruno", false, "Paguei mensalidade"),
        "garbage".to_string(),
        message("bruno@c.us", "Bruno", false, "lista mensal"),
    ]
    .join("\n");

    let output = racha(&dir)
        .arg("--ledger")
        .arg(&ledger)
        .arg("serve")
        .write_stdin(input)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let replies: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0]["chatId"], "G1");
    assert_eq!(replies[0]["text"], "✅ Registrado: Bruno pagou MENSALIDADE");
    let list = replies[1]["text"].as_str().unwrap();
    assert!(list.ends_with("\n1. Bruno ✅\n2. 5511999990000 ❌"), "{list}");

    let stored = read_ledger(&ledger);
    assert_eq!(stored["G1"]["payments"]["mensalidade"]["Bruno"], true);
    assert!(stored["G1"]["updatedAt"].is_string());
}

#[test]
fn empty_input_creates_empty_ledger() {
    let dir = TempDir::new().unwrap();
    racha(&dir)
        .args(["--ledger", "ledger.json", "serve"])
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
    assert_eq!(read_ledger(&dir.path().join("ledger.json")), json!({}));
}

#[test]
fn offline_reports_read_the_ledger() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("payments.json"),
        serde_json::to_string_pretty(&json!({
            "G1": {
                "updatedAt": "2025-09-05T12:30:00Z",
                "payments": {
                    "mensalidade": {"Bruno": true},
                    "churrasco": {},
                    "diaria": {"Carla": true, "Bruno": true}
                }
            }
        }))
        .unwrap(),
    )
    .unwrap();

    racha(&dir)
        .args(["--ledger", "payments.json", "list", "--chat", "G1"])
        .args(["--category", "diaria"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("📋 Lista Diária (R$20,00)\n"))
        .stdout(predicate::str::contains("\n1. Bruno ✅\n2. Carla ✅\n"));

    racha(&dir)
        .args(["--ledger", "payments.json", "list", "--chat", "G1"])
        .args(["--category", "mensal", "--member", "Carla", "--member", "Bruno"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\n1. Carla ❌\n2. Bruno ✅\n"));

    racha(&dir)
        .args(["--ledger", "payments.json", "status", "--chat", "G1"])
        .args(["--name", "Carla"])
        .assert()
        .success()
        .stdout("👤 Carla\nMensalidade: ❌\nChurrasco: ❌\nDiária: ✅\n");
}

#[test]
fn config_file_supplies_the_ledger_path() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("racha.toml"),
        "ledger_path = \"from-config.json\"\ndebounce_ms = 50\n",
    )
    .unwrap();
    racha(&dir)
        .arg("serve")
        .write_stdin(message("ana@c.us", "Ana", true, "paguei churrasco"))
        .assert()
        .success();
    let stored = read_ledger(&dir.path().join("from-config.json"));
    assert_eq!(stored["G1"]["payments"]["churrasco"]["Ana"], true);
}

#[test]
fn invalid_config_is_reported() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("racha.toml"), "debounce_ms = 0\n").unwrap();
    racha(&dir)
        .args(["status", "--chat", "G1", "--name", "Ana"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("debounce_ms must be > 0"));
}

#[test]
fn schema_describes_both_directions() {
    let dir = TempDir::new().unwrap();
    let output = racha(&dir).arg("schema").assert().success();
    let schema: Value = serde_json::from_slice(&output.get_output().stdout).unwrap();
    assert!(schema["incoming"]["properties"]["chat"].is_object());
    assert!(schema["outgoing"]["properties"]["chatId"].is_object());
}
