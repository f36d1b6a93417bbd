#![allow(deprecated)] // TODO: cargo_bin → cargo_bin_cmd! へ移行

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// ユーザー設定・環境変数の影響を受けない stack コマンド
fn stack(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("stack").unwrap();
    cmd.current_dir(home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("HOME", home)
        .env_remove("STACKFLOW_FILE")
        .env_remove("STACKFLOW_STATE")
        .env_remove("AWS_REGION")
        .env_remove("AWS_PROFILE");
    cmd
}

fn write_document(dir: &TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("stack.yaml");
    fs::write(&path, content).unwrap();
    path
}

/// CLIヘルプが正しく表示されることを確認
#[test]
fn test_cli_help() {
    let temp_dir = tempfile::tempdir().unwrap();
    stack(temp_dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("provision"))
        .stdout(predicate::str::contains("destroy"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("forget"))
        .stdout(predicate::str::contains("suggest-ami"));
}

/// バージョン表示が正しく動作することを確認
#[test]
fn test_cli_version() {
    let temp_dir = tempfile::tempdir().unwrap();
    stack(temp_dir.path())
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("stackflow"));
}

/// provisionコマンドのヘルプにオプションが表示されることを確認
#[test]
fn test_provision_help() {
    let temp_dir = tempfile::tempdir().unwrap();
    stack(temp_dir.path())
        .args(["provision", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--parallel"))
        .stdout(predicate::str::contains("--timeout"));
}

/// reconcile は provision のエイリアス
#[test]
fn test_reconcile_alias() {
    let temp_dir = tempfile::tempdir().unwrap();
    stack(temp_dir.path())
        .args(["reconcile", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn test_validate_document() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_document(
        &temp_dir,
        r#"
instances:
  - instance_name: web-01
    image_id: ami-123
    instance_type: t3.micro
buckets:
  - bucket_name: assets
resources:
  - type: bogus
    name: strange
"#,
    );

    stack(temp_dir.path())
        .arg("validate")
        .assert()
        .success()
        .stdout(predicate::str::contains("リソース定義は正常です"))
        .stdout(predicate::str::contains("web-01"))
        .stdout(predicate::str::contains("未対応のタイプ"));
}

#[test]
fn test_validate_missing_identifier_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    let path = write_document(&temp_dir, "buckets:\n  - region: us-east-1\n");

    stack(temp_dir.path())
        .arg("validate")
        .arg("-f")
        .arg(&path)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("定義エラー"));
}

#[test]
fn test_validate_without_document_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    stack(temp_dir.path())
        .arg("validate")
        .assert()
        .failure()
        .stderr(predicate::str::contains("リソース定義ファイルが見つかりません"));
}

#[test]
fn test_dry_run_does_not_touch_ledger() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_document(
        &temp_dir,
        "buckets:\n  - bucket_name: a\n  - bucket_name: b\nresources:\n  - type: bogus\n    name: x\n",
    );

    stack(temp_dir.path())
        .args(["provision", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("would-create"))
        .stdout(predicate::str::contains("buckets/a"))
        .stdout(predicate::str::contains("unsupported"));

    assert!(!temp_dir.path().join(".stackflow").exists());
}

#[test]
fn test_dry_run_json_report() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_document(&temp_dir, "buckets:\n  - bucket_name: a\n");
    let ledger = temp_dir.path().join("ledger.yaml");
    fs::write(&ledger, "buckets:\n  a: {}\n").unwrap();

    let output = stack(temp_dir.path())
        .arg("--state")
        .arg(&ledger)
        .args(["provision", "--dry-run", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["action"], "provision");
    assert_eq!(report["dry_run"], true);
    assert_eq!(report["outcomes"][0]["status"], "skipped");
    assert_eq!(fs::read_to_string(&ledger).unwrap(), "buckets:\n  a: {}\n");
}

#[test]
fn test_status_shows_ledger() {
    let temp_dir = tempfile::tempdir().unwrap();
    let ledger = temp_dir.path().join("state.yaml");
    fs::write(
        &ledger,
        "buckets:\n  assets: {}\ninstances:\n  web-01:\n    instance_id: i-0abc\n",
    )
    .unwrap();

    stack(temp_dir.path())
        .env("STACKFLOW_STATE", &ledger)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("assets"))
        .stdout(predicate::str::contains("instance_id=i-0abc"))
        .stdout(predicate::str::contains("合計: 2件"));
}

#[test]
fn test_status_json() {
    let temp_dir = tempfile::tempdir().unwrap();
    let ledger = temp_dir.path().join("state.yaml");
    fs::write(&ledger, "buckets:\n  assets: {}\n").unwrap();

    let output = stack(temp_dir.path())
        .arg("--state")
        .arg(&ledger)
        .args(["status", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let record: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(record, serde_json::json!({"buckets": {"assets": {}}}));
}

#[test]
fn test_status_without_ledger() {
    let temp_dir = tempfile::tempdir().unwrap();
    stack(temp_dir.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("記録されていません"));

    // status は台帳ファイルを作成しない
    assert!(!temp_dir.path().join(".stackflow").exists());
}

#[test]
fn test_corrupt_ledger_is_fatal() {
    let temp_dir = tempfile::tempdir().unwrap();
    let ledger = temp_dir.path().join("state.yaml");
    fs::write(&ledger, "buckets: [unclosed\n").unwrap();
    write_document(&temp_dir, "buckets:\n  - bucket_name: a\n");

    stack(temp_dir.path())
        .arg("--state")
        .arg(&ledger)
        .args(["provision", "--dry-run"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("corrupt"));

    assert_eq!(fs::read_to_string(&ledger).unwrap(), "buckets: [unclosed\n");
}

#[test]
fn test_forget_removes_entry() {
    let temp_dir = tempfile::tempdir().unwrap();
    let ledger = temp_dir.path().join("state.yaml");
    fs::write(&ledger, "buckets:\n  a: {}\n  b: {}\n").unwrap();

    stack(temp_dir.path())
        .arg("--state")
        .arg(&ledger)
        .args(["forget", "buckets", "a"])
        .assert()
        .success()
        .stdout(predicate::str::contains("台帳から削除しました"));

    let content = fs::read_to_string(&ledger).unwrap();
    let record: serde_yaml::Value = serde_yaml::from_str(&content).unwrap();
    assert!(record["buckets"].get("a").is_none());
    assert!(record["buckets"].get("b").is_some());
}

#[test]
fn test_forget_unknown_entry_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    let ledger = temp_dir.path().join("state.yaml");
    fs::write(&ledger, "buckets:\n  a: {}\n").unwrap();

    stack(temp_dir.path())
        .arg("--state")
        .arg(&ledger)
        .args(["forget", "bucket", "a"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("利用可能なタイプ"));
}

#[test]
fn test_destroy_with_empty_ledger() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_document(&temp_dir, "buckets:\n  - bucket_name: a\n");

    stack(temp_dir.path())
        .args(["destroy", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("記録されていません"));
}

#[test]
fn test_destroy_dry_run_lists_recorded() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_document(&temp_dir, "buckets:\n  - bucket_name: a\n  - bucket_name: b\n");
    let ledger = temp_dir.path().join("state.yaml");
    fs::write(&ledger, "buckets:\n  a: {}\n").unwrap();

    stack(temp_dir.path())
        .arg("--state")
        .arg(&ledger)
        .args(["destroy", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("would-delete"))
        .stdout(predicate::str::contains("buckets/a"));

    assert_eq!(fs::read_to_string(&ledger).unwrap(), "buckets:\n  a: {}\n");
}

#[test]
fn test_list_unknown_kind_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    stack(temp_dir.path())
        .args(["list", "lambda"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("不明な種別です"));
}

/// 引数を記録し、deny マーカーがある間は denied バケットの作成を拒否する aws スタブ
#[cfg(unix)]
fn install_aws_stub(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    use std::os::unix::fs::PermissionsExt;

    let bin = dir.join("bin");
    fs::create_dir_all(&bin).unwrap();
    let log = dir.join("aws.log");
    let deny = dir.join("deny");

    let script = format!(
        r#"#!/bin/sh
printf '%s\n' "$*" >> '{log}'
case "$*" in
  *"sts get-caller-identity"*)
    echo '{{"UserId": "AIDA", "Account": "123456789012", "Arn": "arn:aws:iam::123456789012:user/ci"}}' ;;
  *"s3api create-bucket --bucket denied"*)
    if [ -f '{deny}' ]; then
      echo "An error occurred (AccessDenied) when calling the CreateBucket operation: Access Denied" >&2
      exit 254
    fi
    echo '{{"Location": "/denied"}}' ;;
  *"iam create-user --user-name deploy-bot"*)
    echo '{{"User": {{"UserName": "deploy-bot", "Arn": "arn:aws:iam::123456789012:user/deploy-bot"}}}}' ;;
  *)
    echo '{{}}' ;;
esac
"#,
        log = log.display(),
        deny = deny.display(),
    );

    let stub = bin.join("aws");
    fs::write(&stub, script).unwrap();
    fs::set_permissions(&stub, fs::Permissions::from_mode(0o755)).unwrap();
    fs::write(&deny, "").unwrap();

    (bin, log)
}

#[cfg(unix)]
fn stub_path(bin: &Path) -> std::ffi::OsString {
    let mut paths = vec![bin.to_path_buf()];
    paths.extend(std::env::split_paths(&std::env::var_os("PATH").unwrap_or_default()));
    std::env::join_paths(paths).unwrap()
}

#[cfg(unix)]
#[test]
fn test_provision_exit_code_follows_failures() {
    let temp_dir = tempfile::tempdir().unwrap();
    write_document(
        &temp_dir,
        r#"
buckets:
  - bucket_name: assets
  - bucket_name: denied
resources:
  - type: iam_user
    name: deployer
    user_name: deploy-bot
"#,
    );
    let (bin, log) = install_aws_stub(temp_dir.path());
    let ledger = temp_dir.path().join("state.yaml");

    stack(temp_dir.path())
        .env("PATH", stub_path(&bin))
        .arg("--state")
        .arg(&ledger)
        .arg("provision")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("AccessDenied"));

    let record: serde_yaml::Value =
        serde_yaml::from_str(&fs::read_to_string(&ledger).unwrap()).unwrap();
    assert!(record["buckets"]["assets"].is_mapping());
    assert!(record["buckets"]["denied"].is_null());
    assert_eq!(
        record["iam_users"]["deployer"]["user_name"].as_str(),
        Some("deploy-bot")
    );

    let calls = fs::read_to_string(&log).unwrap();
    assert!(calls.contains("iam create-user --user-name deploy-bot"));

    // 拒否を解除して再実行すると、失敗したバケットだけが作成される
    fs::remove_file(temp_dir.path().join("deny")).unwrap();
    fs::remove_file(&log).unwrap();

    stack(temp_dir.path())
        .env("PATH", stub_path(&bin))
        .arg("--state")
        .arg(&ledger)
        .arg("provision")
        .assert()
        .success();

    let calls = fs::read_to_string(&log).unwrap();
    assert!(calls.contains("s3api create-bucket --bucket denied"));
    assert!(!calls.contains("--bucket assets"));
    assert!(!calls.contains("create-user"));

    let record: serde_yaml::Value =
        serde_yaml::from_str(&fs::read_to_string(&ledger).unwrap()).unwrap();
    assert!(record["buckets"]["assets"].is_mapping());
    assert!(record["buckets"]["denied"].is_mapping());
}

#[test]
fn test_destroy_help_shows_parallel_and_timeout() {
    let temp_dir = tempfile::tempdir().unwrap();
    stack(temp_dir.path())
        .args(["destroy", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--parallel"))
        .stdout(predicate::str::contains("--timeout"));
}
