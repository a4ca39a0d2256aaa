use assert_cmd::Command;
use predicates::prelude::*;

fn brdoc() -> Command {
    Command::cargo_bin("brdoc").unwrap()
}

#[test]
fn test_config_init_then_get() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("brdoc.json");
    let path = path.to_str().unwrap();

    brdoc()
        .args(["config", "--config", path, "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created configuration file"));

    brdoc()
        .args(["--config", path, "config", "get", "pdf.render_dpi"])
        .assert()
        .success()
        .stdout(predicate::str::contains("200"));

    brdoc()
        .args(["--config", path, "config", "set", "ocr.engine", "tesseract"])
        .assert()
        .success();

    brdoc()
        .args(["--config", path, "config", "get", "ocr.engine"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"tesseract\""));
}

#[test]
fn test_config_init_refuses_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("brdoc.json");
    let path = path.to_str().unwrap();

    brdoc().args(["--config", path, "config", "init"]).assert().success();
    brdoc()
        .args(["--config", path, "config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--force"));
}

#[test]
fn test_extract_missing_file() {
    brdoc()
        .args(["extract", "/nonexistent/nota.pdf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_extract_rejects_non_pdf() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nota.txt");
    std::fs::write(&path, "CNPJ 12.345.678/0001-99").unwrap();

    brdoc()
        .arg("extract")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported file format"));
}
