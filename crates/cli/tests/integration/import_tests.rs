//! Package import, fetch and the recursive build, driven through the binary.
//!
//! Packages are served from local repositories over `file://`; the build of
//! each package is the binary re-invoking itself in the checkout.

use predicates::prelude::*;

use super::common::{TestEnv, git_available, package_repo};

#[test]
fn import_flag_pins_package_without_command() {
  if !git_available() {
    return;
  }
  let env = TestEnv::new();
  let (url, head) = package_repo(&env, "tools", "hello", "echo hello from package");

  env.run_cmd().args(["-i", &url]).assert().success();

  assert_eq!(
    std::fs::read_to_string(env.lock_file()).unwrap(),
    format!("{} {}\n", url, head)
  );
}

#[test]
fn import_flag_then_runs_package_command() {
  if !git_available() {
    return;
  }
  let env = TestEnv::new();
  let (url, _) = package_repo(&env, "tools", "hello", r#"echo "hello $1""#);

  env
    .run_cmd()
    .args(["-i", &url, "hello", "package"])
    .assert()
    .success()
    .stdout(predicate::str::contains("hello package"));
}

#[test]
fn hook_import_exposes_package_commands() {
  if !git_available() {
    return;
  }
  let env = TestEnv::new();
  let (url, head) = package_repo(&env, "tools", "hello", "echo hello from package");
  env.write_file(".run/init.lua", &format!("run.import('{}')\n", url));

  env
    .run_cmd()
    .arg("hello")
    .assert()
    .success()
    .stdout(predicate::str::contains("hello from package"));
  assert_eq!(
    std::fs::read_to_string(env.lock_file()).unwrap(),
    format!("{} {}\n", url, head)
  );

  // Second run is served from the store.
  env
    .run_cmd()
    .arg("hello")
    .assert()
    .success()
    .stdout(predicate::str::contains("hello from package"));
  assert!(env.store_path().join("by-src").join(&head).exists());
}

#[test]
fn get_flag_prints_store_path_without_pinning() {
  if !git_available() {
    return;
  }
  let env = TestEnv::new();
  let (url, _) = package_repo(&env, "tools", "hello", "echo hello");

  let output = env.run_cmd().args(["-g", &url]).output().unwrap();

  assert!(output.status.success());
  let stdout = String::from_utf8(output.stdout).unwrap();
  let path = stdout.lines().last().unwrap();
  assert!(path.starts_with(&env.store_path().display().to_string()));
  assert!(std::path::Path::new(path).join(".run/hello").is_file());
  assert!(!env.lock_file().exists());
}

#[test]
fn unreachable_package_fails() {
  if !git_available() {
    return;
  }
  let env = TestEnv::new();
  let missing = format!("file://{}", env.repos_path().join("missing").display());

  env
    .run_cmd()
    .args(["-i", &missing])
    .assert()
    .code(1)
    .stderr(predicate::str::contains("failed to clone"));
  assert!(!env.lock_file().exists());
}
