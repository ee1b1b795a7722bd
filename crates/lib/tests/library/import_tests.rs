//! Importing through the resolution context.

use std::fs;

use run_lib::context::{ContextError, RunContext};
use run_lib::defer::DeferList;
use run_lib::import::ImportError;
use run_lib::resolve::ResolveError;
use uuid::Uuid;

use super::common::{Sandbox, commit_repo, file_url, git_available, write_command, write_file};

fn context(sb: &Sandbox) -> RunContext {
  RunContext::new(sb.project(), Uuid::new_v4(), false, DeferList::new(), sb.importer())
}

#[test]
fn import_pins_and_runs_from_the_package() {
  if !git_available() {
    return;
  }
  let sb = Sandbox::new();
  let repo = sb.root().join("repos/tools");
  write_command(&repo, "lint", "echo lint");
  let head = commit_repo(&repo);
  let url = file_url(&repo);
  let ctx = context(&sb);

  let node = ctx.import(vec!["lint".to_string(), "-q".to_string()], &url).unwrap();
  let resolution = ctx.resolve_imported(node).unwrap();

  assert!(resolution.program.starts_with(sb.store().dir()));
  assert_eq!(resolution.args(), ["-q"]);
  assert_eq!(
    fs::read_to_string(sb.project().join(".run/.runlock")).unwrap(),
    format!("{} {}\n", url, head)
  );
}

#[test]
fn import_without_command_namespace_fails_and_records_nothing() {
  if !git_available() {
    return;
  }
  let sb = Sandbox::new();
  let repo = sb.root().join("repos/plain");
  write_file(&repo.join("README"), "no commands here");
  commit_repo(&repo);
  let ctx = context(&sb);

  let err = ctx.import(Vec::new(), &file_url(&repo)).unwrap_err();

  assert!(matches!(err, ContextError::Import(ImportError::NoNamespace(_))));
  assert!(!sb.project().join(".run/.runlock").exists());
}

#[test]
fn fetch_materializes_without_pinning() {
  if !git_available() {
    return;
  }
  let sb = Sandbox::new();
  let repo = sb.root().join("repos/tools");
  write_command(&repo, "lint", "echo lint");
  let head = commit_repo(&repo);
  let ctx = context(&sb);

  let package = ctx.fetch(&file_url(&repo)).unwrap();

  assert_eq!(package.rev, head);
  assert!(package.path.join(".run/lint").is_file());
  assert!(!sb.project().join(".run/.runlock").exists());
}

#[test]
fn unreachable_repository_is_a_fetch_error() {
  if !git_available() {
    return;
  }
  let sb = Sandbox::new();
  let ctx = context(&sb);
  let missing = file_url(&sb.root().join("repos/missing"));

  let err = ctx.import(Vec::new(), &missing).unwrap_err();

  assert!(matches!(err, ContextError::Import(ImportError::Fetch(_))));
  assert!(err.to_string().contains("failed to clone"));
}

#[test]
fn failing_hook_import_aborts_resolution() {
  if !git_available() {
    return;
  }
  let sb = Sandbox::new();
  let missing = file_url(&sb.root().join("repos/missing"));
  write_command(&sb.project(), "hello", "echo hello");
  write_file(
    &sb.project().join(".run/init.lua"),
    &format!("run.import('{}')\n", missing),
  );
  let ctx = context(&sb);

  let err = ctx.resolve(vec!["hello".to_string()]).unwrap_err();

  assert!(matches!(err, ContextError::Resolve(ResolveError::Node(_))));
  assert!(err.to_string().contains("failed to import package"));
}
