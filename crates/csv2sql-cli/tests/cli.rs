//! End-to-end tests for the `csv2sql` binary against SQLite databases in a
//! temporary directory.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn csv2sql() -> Command {
    Command::cargo_bin("csv2sql").expect("binary builds")
}

fn write_csv(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn db_arg(dir: &Path) -> String {
    dir.join("imports").to_string_lossy().into_owned()
}

#[test]
fn test_backends_lists_all_three() {
    csv2sql()
        .arg("backends")
        .assert()
        .success()
        .stdout(predicate::str::contains("mysql"))
        .stdout(predicate::str::contains("postgres"))
        .stdout(predicate::str::contains("sqlite"));
}

#[test]
fn test_analyze_only_prints_schema_without_database() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(dir.path(), "people.csv", "id,name\n1,ada\n2,grace\n");

    csv2sql()
        .args(["import-csv", "--analyze-only"])
        .arg(&csv)
        .current_dir(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("TINYINT"))
        .stdout(predicate::str::contains("VARCHAR"));

    assert!(!dir.path().join("imports.db").exists());
}

#[test]
fn test_import_into_sqlite_succeeds() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(dir.path(), "people.csv", "id,name\n1,ada\n2,grace\n");

    csv2sql()
        .args(["--db-type", "sqlite", "--database", &db_arg(dir.path())])
        .args(["import-csv", "--table", "people"])
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("rows inserted:   2"));

    assert!(dir.path().join("imports.db").exists());
}

#[test]
fn test_import_fail_policy_exits_nonzero_on_existing_table() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(dir.path(), "people.csv", "id\n1\n");
    let db = db_arg(dir.path());

    csv2sql()
        .args(["--db-type", "sqlite", "--database", &db])
        .args(["import-csv", "--table", "people", "--if-exists", "fail"])
        .arg(&csv)
        .assert()
        .success();

    csv2sql()
        .args(["--db-type", "sqlite", "--database", &db])
        .args(["import-csv", "--table", "people", "--if-exists", "fail"])
        .arg(&csv)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_import_replace_twice_with_yes() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(dir.path(), "people.csv", "id\n1\n2\n3\n");
    let db = db_arg(dir.path());

    for _ in 0..2 {
        csv2sql()
            .args(["--db-type", "sqlite", "--database", &db])
            .args(["import-csv", "--table", "people", "--if-exists", "replace", "--yes"])
            .arg(&csv)
            .assert()
            .success()
            .stdout(predicate::str::contains("rows inserted:   3"));
    }
}

#[test]
fn test_malformed_rows_degrade_exit_code() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(dir.path(), "rows.csv", "a,b\n1,2\nonly_one\n3,4\n");

    csv2sql()
        .args(["--db-type", "sqlite", "--database", &db_arg(dir.path())])
        .args(["import-csv", "--table", "rows"])
        .arg(&csv)
        .assert()
        .code(2)
        .stdout(predicate::str::contains("malformed rows:  1"));
}

#[test]
fn test_list_tables_shows_imported_table() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(dir.path(), "people.csv", "id\n1\n");
    let db = db_arg(dir.path());

    csv2sql()
        .args(["--db-type", "sqlite", "--database", &db])
        .args(["import-csv"])
        .arg(&csv)
        .assert()
        .success();

    csv2sql()
        .args(["--db-type", "sqlite", "--database", &db])
        .arg("list-tables")
        .assert()
        .success()
        .stdout(predicate::str::contains("people"));
}

#[test]
fn test_unknown_backend_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(dir.path(), "people.csv", "id\n1\n");

    csv2sql()
        .args(["--db-type", "oracle"])
        .args(["import-csv"])
        .arg(&csv)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown database backend"));
}

#[test]
fn test_config_file_provides_connection_settings() {
    let dir = TempDir::new().unwrap();
    let csv = write_csv(dir.path(), "people.csv", "id\n1\n");
    let conf = dir.path().join("conf.yaml");
    fs::write(
        &conf,
        format!(
            "database:\n  type: sqlite\n  database: {}\n",
            db_arg(dir.path())
        ),
    )
    .unwrap();

    csv2sql()
        .arg("--config")
        .arg(&conf)
        .args(["import-csv"])
        .arg(&csv)
        .assert()
        .success();

    assert!(dir.path().join("imports.db").exists());
}
