use assert_cmd::Command;
use predicates::boolean::PredicateBooleanExt;
use predicates::str::contains;
use tempfile::NamedTempFile;

#[test]
fn script_mode_runs_basic_flow() {
    let tmp = NamedTempFile::new().unwrap();
    let input = "demo-app\njava17\nmaven\nhello-world\neu-west-1\n";

    let mut cmd = Command::cargo_bin("wizard_core_cli").unwrap();
    cmd.env("WIZARD_CORE_CLI_SCRIPT", "1")
        .arg(tmp.path())
        .write_stdin(input)
        .assert()
        .success()
        .stdout(contains("Project configured"))
        .stdout(contains("demo-app"))
        .stdout(contains("maven"));

    let json = std::fs::read_to_string(tmp.path()).unwrap();
    assert!(json.contains("\"java17\""));
    assert!(json.contains("\"demo-app-artifacts\""));
}

#[test]
fn script_mode_skips_the_dependency_manager_for_node() {
    let input = "demo-app\nnodejs18.x\nhello-world\neu-west-1\n";

    let mut cmd = Command::cargo_bin("wizard_core_cli").unwrap();
    cmd.env("WIZARD_CORE_CLI_SCRIPT", "1")
        .write_stdin(input)
        .assert()
        .success()
        .stdout(contains("nodejs18.x"))
        .stdout(contains("Manager:").not());
}

#[test]
fn script_mode_supports_back_edits() {
    // Back out of the revealed dependency-manager step and change runtimes.
    let input = "demo-app\njava17\n:back\nnodejs18.x\nhello-world\neu-west-1\n";

    let mut cmd = Command::cargo_bin("wizard_core_cli").unwrap();
    cmd.env("WIZARD_CORE_CLI_SCRIPT", "1")
        .write_stdin(input)
        .assert()
        .success()
        .stdout(contains("nodejs18.x"))
        .stdout(contains("Manager:").not());
}

#[test]
fn script_mode_confirms_exit() {
    let input = "demo-app\n:exit\n:yes\n";

    let mut cmd = Command::cargo_bin("wizard_core_cli").unwrap();
    cmd.env("WIZARD_CORE_CLI_SCRIPT", "1")
        .write_stdin(input)
        .assert()
        .success()
        .stdout(contains("Wizard cancelled."));
}

#[test]
fn script_mode_resumes_after_declined_exit() {
    let input = "demo-app\n:exit\n:no\npython3.12\nrest-api\nap-northeast-1\n";

    let mut cmd = Command::cargo_bin("wizard_core_cli").unwrap();
    cmd.env("WIZARD_CORE_CLI_SCRIPT", "1")
        .write_stdin(input)
        .assert()
        .success()
        .stdout(contains("python3.12"))
        .stdout(contains("rest-api"));
}
