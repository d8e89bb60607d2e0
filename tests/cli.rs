use std::path::PathBuf;

use assert_cmd::Command;
use tempfile::tempdir;

fn test_data(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

fn wardsim() -> Command {
    Command::cargo_bin("wardsim").unwrap()
}

#[test]
fn runs_the_sample_hospital() {
    let output = tempdir().unwrap();
    wardsim()
        .arg("--config")
        .arg(test_data("hospital.json"))
        .arg("--output-dir")
        .arg(output.path())
        .assert()
        .success();

    let news = std::fs::read_to_string(output.path().join("news.csv")).unwrap();
    assert!(news.starts_with("time,message\n"));
    assert!(news.contains("An unidentified viral illness has broken out."));

    let mut incidence = csv::Reader::from_path(output.path().join("incidence.csv")).unwrap();
    let headers = incidence.headers().unwrap().clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        vec!["time", "person_id", "ward", "role", "infection_status"]
    );
    // The two index cases at least.
    assert!(incidence.records().count() >= 2);
}

#[test]
fn same_seed_same_reports() {
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();
    for output in [&first, &second] {
        wardsim()
            .arg("--config")
            .arg(test_data("hospital.json"))
            .args(["--random-seed", "9", "--output-dir"])
            .arg(output.path())
            .assert()
            .success();
    }
    for report in ["news.csv", "incidence.csv"] {
        assert_eq!(
            std::fs::read_to_string(first.path().join(report)).unwrap(),
            std::fs::read_to_string(second.path().join(report)).unwrap(),
        );
    }
}

#[test]
fn existing_reports_need_force_overwrite() {
    let output = tempdir().unwrap();
    let run = |force: bool| {
        let mut command = wardsim();
        command
            .arg("--config")
            .arg(test_data("hospital.json"))
            .arg("--output-dir")
            .arg(output.path());
        if force {
            command.arg("--force-overwrite");
        }
        command.assert()
    };
    run(false).success();
    run(false).failure();
    run(true).success();
}

#[test]
fn invalid_config_fails() {
    wardsim()
        .arg("--config")
        .arg(test_data("invalid_levels.json"))
        .assert()
        .failure();
}

#[test]
fn unknown_log_level_fails() {
    let output = tempdir().unwrap();
    wardsim()
        .args(["--log-level", "chatty", "--output-dir"])
        .arg(output.path())
        .assert()
        .failure();
}
