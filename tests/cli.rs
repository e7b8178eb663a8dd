use assert_cmd::Command;
use predicates::prelude::*;

fn reportpoll() -> Command {
    let mut cmd = Command::cargo_bin("reportpoll").unwrap();
    for key in [
        "TITLEID",
        "BUILDIDENTIFIER",
        "WORKSPACEPATH",
        "TIMEOUT",
        "POLLINTERVALMS",
        "VERBOSE",
        "BASEURL",
    ] {
        cmd.env_remove(format!("REPORTPOLL_{}", key));
    }
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_missing_title_id_fails_before_network() {
    reportpoll()
        .arg("run")
        .arg("buildIdentifier=jenkins-42")
        .arg("baseUrl=http://127.0.0.1:1")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("titleid"))
        .stdout(predicate::str::contains("Logging in to").not());
}

#[test]
fn test_missing_build_identifier_fails() {
    reportpoll()
        .arg("validate")
        .arg("titleId=6195")
        .assert()
        .failure()
        .stderr(predicate::str::contains("buildidentifier"));
}

#[test]
fn test_bare_positional_is_rejected() {
    reportpoll()
        .arg("run")
        .args(["6195", "buildIdentifier=jenkins-42", "baseUrl=http://127.0.0.1:1"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Malformed argument"))
        .stdout(predicate::str::contains("Logging in to").not());
}

#[test]
fn test_invalid_timeout_fails() {
    reportpoll()
        .arg("validate")
        .args(["titleId=6195", "buildIdentifier=b", "timeout=soon"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("timeout"));
}

#[test]
fn test_validate_prints_resolved_config() {
    let temp_dir = tempfile::tempdir().unwrap();

    reportpoll()
        .arg("validate")
        .arg("titleId=6195")
        .arg("buildIdentifier=jenkins-42")
        .arg(format!("workspacePath={}", temp_dir.path().display()))
        .assert()
        .success()
        .stdout(predicate::str::contains("Configuration is valid!"))
        .stdout(predicate::str::contains("https://6195.playfabapi.com"))
        .stdout(predicate::str::contains("Timeout:          30s"))
        .stdout(predicate::str::contains("Poll interval:    4500ms"))
        .stdout(predicate::str::contains("jenkins-42.xml"));

    // validate never writes the report
    assert!(!temp_dir.path().join("jenkins-42.xml").exists());
}

#[test]
fn test_config_file_env_and_args_precedence() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("reportpoll.toml");
    std::fs::write(
        &config_path,
        r#"
[options]
titleId = "FILE"
buildIdentifier = "from-file"
timeout = 120
"#,
    )
    .unwrap();

    reportpoll()
        .arg("--config")
        .arg(&config_path)
        .env("REPORTPOLL_BUILDIDENTIFIER", "from-env")
        .arg("validate")
        .arg("timeout=5")
        .assert()
        .success()
        .stdout(predicate::str::contains("Title id:         FILE"))
        .stdout(predicate::str::contains("Build identifier: from-env"))
        .stdout(predicate::str::contains("Timeout:          5s"));
}

#[test]
fn test_verbose_flag_sets_option() {
    reportpoll()
        .arg("--verbose")
        .arg("validate")
        .args(["titleId=6195", "buildIdentifier=b"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Verbose:          true"));
}

#[test]
fn test_unreadable_config_file_fails() {
    reportpoll()
        .arg("--config")
        .arg("/nonexistent/reportpoll.toml")
        .arg("validate")
        .args(["titleId=6195", "buildIdentifier=b"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load config"));
}

#[test]
fn test_unreachable_backend_exits_with_failure() {
    let temp_dir = tempfile::tempdir().unwrap();

    reportpoll()
        .arg("run")
        .args(["titleId=6195", "buildIdentifier=jenkins-42"])
        .arg("baseUrl=http://127.0.0.1:1")
        .arg(format!("workspacePath={}", temp_dir.path().display()))
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("Logging in to 6195"));

    assert!(!temp_dir.path().join("jenkins-42.xml").exists());
}
