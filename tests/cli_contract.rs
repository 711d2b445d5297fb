//! Contract tests: exit codes, the password gate, and store integrity under
//! rejected mutations.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

fn oee_cmd() -> Command {
    Command::cargo_bin("oee").expect("binary oee is built")
}

const PASSWORD: &str = "D0nderd@g18!";

fn seed_one(store: &str) {
    oee_cmd()
        .args([
            "--store",
            store,
            "add",
            "--date",
            "2026-03-02",
            "--machine",
            "24",
            "--supervisor",
            "Marla",
            "--speed",
            "30",
            "--produced",
            "14250",
        ])
        .assert()
        .success();
}

#[test]
fn rejected_add_reports_every_violation_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("logbook.csv");
    let store_s = store.to_str().unwrap();

    oee_cmd()
        .args([
            "--store",
            store_s,
            "add",
            "--date",
            "03/02/2026",
            "--machine",
            "99",
            "--supervisor",
            "",
            "--speed",
            "0",
            "--produced",
            "100",
        ])
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains("Record not saved"))
        .stderr(predicate::str::contains("Date must be"))
        .stderr(predicate::str::contains("Unknown machine"))
        .stderr(predicate::str::contains("Supervisor"))
        .stderr(predicate::str::contains("Rated speed"));

    assert!(!store.exists());
}

#[test]
fn rejected_beyond_produced_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("logbook.csv");
    let store_s = store.to_str().unwrap();

    oee_cmd()
        .args([
            "--store",
            store_s,
            "add",
            "--date",
            "2026-03-02",
            "--machine",
            "24",
            "--supervisor",
            "Marla",
            "--speed",
            "30",
            "--produced",
            "100",
            "--rejected",
            "200",
        ])
        .assert()
        .failure()
        .code(4);

    assert!(!store.exists());
}

#[test]
fn multi_line_remark_is_refused_and_the_store_stays_readable() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("logbook.csv");
    let store_s = store.to_str().unwrap();

    seed_one(store_s);
    let before = fs::read(&store).unwrap();

    oee_cmd()
        .args([
            "--store",
            store_s,
            "add",
            "--date",
            "2026-03-03",
            "--machine",
            "24",
            "--supervisor",
            "Marla",
            "--speed",
            "30",
            "--produced",
            "100",
            "--remark",
            "line jam\nsee QC",
        ])
        .assert()
        .failure()
        .code(4)
        .stderr(predicate::str::contains("line breaks"));

    assert_eq!(fs::read(&store).unwrap(), before);

    oee_cmd()
        .args(["--store", store_s, "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("s0001"));
}

#[test]
fn padded_machine_id_is_stored_trimmed_and_filterable() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("logbook.csv");
    let store_s = store.to_str().unwrap();

    oee_cmd()
        .args([
            "--store",
            store_s,
            "add",
            "--date",
            "2026-03-02",
            "--machine",
            " 24 ",
            "--supervisor",
            "Marla",
            "--speed",
            "30",
            "--produced",
            "100",
        ])
        .assert()
        .success();

    let out = oee_cmd()
        .args([
            "--store",
            store_s,
            "--format",
            "json",
            "list",
            "--machine",
            "24",
        ])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["records"].as_array().unwrap().len(), 1);
    assert_eq!(v["records"][0]["machine_id"], "24");
}

#[test]
fn edit_without_the_password_is_denied_and_the_store_is_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("logbook.csv");
    let store_s = store.to_str().unwrap();

    seed_one(store_s);
    let before = fs::read(&store).unwrap();

    oee_cmd()
        .args(["--store", store_s, "edit", "s0001", "--mechanic", "95"])
        .assert()
        .failure()
        .code(6)
        .stderr(predicate::str::contains("--password"));

    oee_cmd()
        .args([
            "--store",
            store_s,
            "edit",
            "s0001",
            "--password",
            "wrong",
            "--mechanic",
            "95",
        ])
        .assert()
        .failure()
        .code(6)
        .stderr(predicate::str::contains("Incorrect password"));

    assert_eq!(fs::read(&store).unwrap(), before);
}

#[test]
fn admin_password_env_overrides_the_default() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("logbook.csv");
    let store_s = store.to_str().unwrap();

    seed_one(store_s);

    oee_cmd()
        .env("OEE_ADMIN_PASSWORD", "floor-secret")
        .args([
            "--store", store_s, "delete", "s0001", "--password", PASSWORD,
        ])
        .assert()
        .failure()
        .code(6);

    oee_cmd()
        .env("OEE_ADMIN_PASSWORD", "floor-secret")
        .args([
            "--store",
            store_s,
            "delete",
            "s0001",
            "--password",
            "floor-secret",
        ])
        .assert()
        .success();
}

#[test]
fn unknown_id_exits_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("logbook.csv");
    let store_s = store.to_str().unwrap();

    seed_one(store_s);

    oee_cmd()
        .args(["--store", store_s, "show", "s0042"])
        .assert()
        .failure()
        .code(3)
        .stderr(predicate::str::contains("s0042"));
}

#[test]
fn ids_are_never_reused_after_a_delete() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("logbook.csv");
    let store_s = store.to_str().unwrap();

    seed_one(store_s);
    seed_one(store_s);
    oee_cmd()
        .args([
            "--store", store_s, "delete", "s0002", "--password", PASSWORD,
        ])
        .assert()
        .success();

    oee_cmd()
        .args([
            "--store",
            store_s,
            "add",
            "--date",
            "2026-03-04",
            "--machine",
            "11",
            "--supervisor",
            "Marla",
            "--speed",
            "30",
            "--produced",
            "100",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved s0003"));
}

#[test]
fn held_lock_refuses_the_mutation() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("logbook.csv");
    let store_s = store.to_str().unwrap();

    seed_one(store_s);
    fs::write(format!("{}.lock", store_s), b"").unwrap();

    oee_cmd()
        .args([
            "--store", store_s, "delete", "s0001", "--password", PASSWORD,
        ])
        .assert()
        .failure()
        .code(5)
        .stderr(predicate::str::contains("locked"));
}

#[test]
fn corrupted_store_is_reported_not_guessed_at() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("logbook.csv");
    let store_s = store.to_str().unwrap();

    fs::write(&store, "id;not;the;expected;header\n").unwrap();

    oee_cmd()
        .args(["--store", store_s, "list"])
        .assert()
        .failure()
        .code(5)
        .stderr(predicate::str::contains("corrupted"));
}

#[test]
fn import_accepts_decimal_commas_and_counts_dropped_rows() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("logbook.csv");
    let store_s = store.to_str().unwrap();

    let table = dir.path().join("export.csv");
    fs::write(
        &table,
        "date;machine_id;supervisor;crew_size;rated_speed;shift_duration_min;units_produced_total\n\
         2026-03-02;24;Marla;5;30,5;525;14250\n\
         garbage;24;Marla;5;30;525;14250\n",
    )
    .unwrap();

    oee_cmd()
        .args(["--store", store_s, "import", table.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Imported 1 record(s), dropped 1 row(s).",
        ));

    let out = oee_cmd()
        .args(["--store", store_s, "--format", "json", "list"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(v["records"].as_array().unwrap().len(), 1);
    assert_eq!(v["records"][0]["rated_speed"].as_f64().unwrap(), 30.5);
}

#[test]
fn store_path_env_is_used_when_no_flag_is_given() {
    let dir = tempfile::tempdir().unwrap();
    let store = dir.path().join("env-logbook.csv");
    let store_s = store.to_str().unwrap();

    oee_cmd()
        .env("OEE_STORE_PATH", store_s)
        .args([
            "add",
            "--date",
            "2026-03-02",
            "--machine",
            "24",
            "--supervisor",
            "Marla",
            "--speed",
            "30",
            "--produced",
            "100",
        ])
        .assert()
        .success();

    assert!(Path::new(store_s).exists());
}
