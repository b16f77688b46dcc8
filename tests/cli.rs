//! End-to-end tests for the bokfor binary
//!
//! Every test runs against its own data directory through `BOKFOR_DATA_DIR`.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use chrono::{Datelike, Local};
use predicates::prelude::*;
use tempfile::TempDir;

fn bokfor(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("bokfor").unwrap();
    cmd.env("BOKFOR_DATA_DIR", dir.path()).env_remove("RUST_LOG");
    cmd
}

/// A statement dated inside the default (calendar) financial year
fn write_statement(dir: &Path) -> std::path::PathBuf {
    let year = Local::now().date_naive().year();
    let path = dir.join("statement.csv");
    fs::write(
        &path,
        format!(
            "date,description,amount\n\
             {year}-01-10,Avgift bank,-100.00\n\
             {year}-01-15,Inbetalning kund,1250.00\n"
        ),
    )
    .unwrap();
    path
}

#[test]
fn test_init_creates_files() {
    let dir = TempDir::new().unwrap();

    bokfor(&dir)
        .args(["init", "--company", "Exempel AB"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialization complete!"));

    assert!(dir.path().join("config.json").exists());
    assert!(dir.path().join("data").join("ledger.jsonl").exists());

    bokfor(&dir)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Exempel AB"));
}

#[test]
fn test_amount_round_trip() {
    let dir = TempDir::new().unwrap();

    bokfor(&dir)
        .args(["amount", "-1 234,50", "--decimal", ","])
        .assert()
        .success()
        .stdout(predicate::str::contains("-1234.50 kr"))
        .stdout(predicate::str::contains("(-123450 hundredths)"));

    bokfor(&dir)
        .args(["amount", "12.345"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Malformed amount"));
}

#[test]
fn test_import_is_dry_run_without_commit() {
    let dir = TempDir::new().unwrap();
    let statement = write_statement(dir.path());

    bokfor(&dir)
        .arg("import")
        .arg(&statement)
        .args(["--account", "1930"])
        .assert()
        .success()
        .stdout(predicate::str::contains("New transactions:   2"))
        .stdout(predicate::str::contains("Dry run"));

    assert!(!dir.path().join("data").join("transactions.jsonl").exists());
}

#[test]
fn test_import_comma_decimal_statement() {
    let dir = TempDir::new().unwrap();
    let year = Local::now().date_naive().year();
    let statement = dir.path().join("bank.csv");
    fs::write(
        &statement,
        format!("date,description,amount\n{year}-02-01,Avgift,\"-12,34\"\n"),
    )
    .unwrap();

    bokfor(&dir)
        .arg("import")
        .arg(&statement)
        .args(["--account", "1930", "--decimal", ","])
        .assert()
        .success()
        .stdout(predicate::str::contains("-12.34"))
        .stdout(predicate::str::contains("New transactions:   1"));
}

#[test]
fn test_import_twice_adds_nothing() {
    let dir = TempDir::new().unwrap();
    let statement = write_statement(dir.path());

    bokfor(&dir)
        .arg("import")
        .arg(&statement)
        .args(["--account", "1930", "--commit"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved."));

    bokfor(&dir)
        .arg("import")
        .arg(&statement)
        .args(["--account", "1930", "--commit"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Already in log:     2"))
        .stdout(predicate::str::contains("No changes."));

    let log = fs::read_to_string(dir.path().join("data").join("transactions.jsonl")).unwrap();
    assert_eq!(log.lines().count(), 2);
}

#[test]
fn test_verify_then_validate() {
    let dir = TempDir::new().unwrap();
    let yaml = dir.path().join("verifications.yaml");
    fs::write(
        &yaml,
        r#"
- date: 2023-03-05
  text: Office chair
  entries:
    - account: "1930"
      amount: "-1500.00"
    - { "5410": 0 }
- date: 2023-03-01
  text: Bank fee
  entries:
    - { "1930": -100 }
    - { "6570": 0 }
- date: 2023-03-02
  text: Does not balance
  entries:
    - { "1930": -100 }
    - { "6570": 50 }
"#,
    )
    .unwrap();

    bokfor(&dir)
        .arg("verify")
        .arg(&yaml)
        .arg("--commit")
        .assert()
        .success()
        .stdout(predicate::str::contains("Booked 2 of 3"))
        .stdout(predicate::str::contains("Rejected 'Does not balance'"))
        .stdout(predicate::str::contains("Saved."));

    bokfor(&dir)
        .args(["verifications"])
        .assert()
        .success()
        .stdout(predicate::str::contains("A1    2023-03-01  Bank fee"))
        .stdout(predicate::str::contains("A2    2023-03-05  Office chair"));

    bokfor(&dir)
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("Ledger is consistent."));

    bokfor(&dir)
        .args(["audit", "--limit", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("CREATE"));
}

#[test]
fn test_autobook_books_imported_fee() {
    let dir = TempDir::new().unwrap();
    let statement = write_statement(dir.path());
    let rules = dir.path().join("autobook.yaml");
    fs::write(
        &rules,
        r#"
- name: bank-fee
  description: "^Avgift"
  account: "1930"
  action:
    counter: "6570"
"#,
    )
    .unwrap();

    bokfor(&dir)
        .arg("import")
        .arg(&statement)
        .args(["--account", "1930", "--commit"])
        .assert()
        .success();

    bokfor(&dir)
        .args(["autobook", "--commit"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Booked:   1"))
        .stdout(predicate::str::contains("Saved."));

    bokfor(&dir)
        .arg("validate")
        .assert()
        .success();

    bokfor(&dir)
        .arg("accounts")
        .assert()
        .success()
        .stdout(predicate::str::contains("6570"));
}

#[test]
fn test_validate_fails_on_broken_ledger() {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("data")).unwrap();
    fs::write(
        dir.path().join("data").join("ledger.jsonl"),
        r#"{"Account":{"number":"1930","name":"Bank","openingBalance":100,"balance":100}}
"#,
    )
    .unwrap();

    bokfor(&dir)
        .args(["validate", "--fail-fast"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("1 violation(s)"));
}
