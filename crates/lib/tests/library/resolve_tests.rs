//! End-to-end command resolution over a real store and source cache.

use std::fs;

use run_lib::resolve::{ResolveError, resolve};

use super::common::{Sandbox, commit_repo, file_url, git_available, write_command, write_file};

#[test]
fn locked_package_with_store_alias_needs_no_work() {
  let sb = Sandbox::new();
  let store = sb.store();
  let prebuilt = sb.root().join("prebuilt");
  write_command(&prebuilt, "build", "echo foo");
  let entry = store.add(&prebuilt).unwrap();
  store.alias("abc123", &entry).unwrap();

  let project = sb.project();
  write_file(&project.join(".run/init.lua"), "run.import('example.org/foo')\n");
  write_file(&project.join(".run/.runlock"), "example.org/foo abc123\n");

  let resolution = resolve(sb.root_node(&["build", "--release"]), &sb.importer()).unwrap();

  assert_eq!(resolution.program, entry.join(".run").join("build"));
  assert_eq!(resolution.args(), ["--release"]);
  assert_eq!(sb.counters.total(), 0, "no fetch, build or redirect expected");
  assert_eq!(
    fs::read_to_string(project.join(".run/.runlock")).unwrap(),
    "example.org/foo abc123\n"
  );
}

#[test]
fn root_command_shadows_package_command() {
  let sb = Sandbox::new();
  let store = sb.store();
  let prebuilt = sb.root().join("prebuilt");
  write_command(&prebuilt, "hello", "echo package");
  let entry = store.add(&prebuilt).unwrap();
  store.alias("abc123", &entry).unwrap();

  let project = sb.project();
  write_command(&project, "hello", "echo project");
  write_file(&project.join(".run/init.lua"), "run.import('example.org/foo@abc123')\n");

  let resolution = resolve(sb.root_node(&["hello"]), &sb.importer()).unwrap();

  assert_eq!(resolution.program, project.join(".run").join("hello"));
}

#[test]
fn unpinned_import_is_fetched_built_pinned_then_reused() {
  if !git_available() {
    return;
  }
  let sb = Sandbox::new();
  let repo = sb.root().join("repos/foo");
  write_command(&repo, "hello", "echo hello");
  let head = commit_repo(&repo);
  let url = file_url(&repo);
  let project = sb.project();
  write_file(&project.join(".run/init.lua"), &format!("run.import('{}')\n", url));

  let first = resolve(sb.root_node(&["hello"]), &sb.importer()).unwrap();

  assert!(first.program.starts_with(sb.store().dir()));
  assert!(first.program.ends_with(".run/hello"));
  assert_eq!(sb.counters.clones.get(), 1);
  assert_eq!(sb.counters.builds.get(), 1);
  assert_eq!(sb.counters.redirects.get(), 1);
  assert_eq!(
    fs::read_to_string(project.join(".run/.runlock")).unwrap(),
    format!("{} {}\n", url, head)
  );
  assert!(sb.store().lookup_src(&head).is_some());

  let second = resolve(sb.root_node(&["hello"]), &sb.importer()).unwrap();

  assert_eq!(second.program, first.program);
  assert_eq!(sb.counters.clones.get(), 1);
  assert_eq!(sb.counters.builds.get(), 1);
  assert_eq!(sb.counters.redirects.get(), 1);
}

#[test]
fn pinned_import_skips_redirect_resolution() {
  if !git_available() {
    return;
  }
  let sb = Sandbox::new();
  let repo = sb.root().join("repos/foo");
  write_command(&repo, "hello", "echo hello");
  let head = commit_repo(&repo);
  let reference = format!("{}@{}", file_url(&repo), head);
  let project = sb.project();
  write_file(&project.join(".run/init.lua"), &format!("run.import('{}')\n", reference));

  resolve(sb.root_node(&["hello"]), &sb.importer()).unwrap();

  assert_eq!(sb.counters.redirects.get(), 0);
  assert_eq!(sb.counters.clones.get(), 1);
  assert_eq!(
    fs::read_to_string(project.join(".run/.runlock")).unwrap(),
    format!("{} {}\n", reference, head)
  );
}

#[test]
fn bad_command_still_records_pins() {
  if !git_available() {
    return;
  }
  let sb = Sandbox::new();
  let repo = sb.root().join("repos/foo");
  write_command(&repo, "hello", "echo hello");
  let head = commit_repo(&repo);
  let url = file_url(&repo);
  let project = sb.project();
  write_file(&project.join(".run/init.lua"), &format!("run.import('{}')\n", url));

  let err = resolve(sb.root_node(&["missing"]), &sb.importer()).unwrap_err();

  assert!(matches!(err, ResolveError::BadCommand(ref name) if name == "missing"));
  assert_eq!(
    fs::read_to_string(project.join(".run/.runlock")).unwrap(),
    format!("{} {}\n", url, head)
  );
}

#[test]
fn nested_package_commands_are_found_breadth_first() {
  if !git_available() {
    return;
  }
  let sb = Sandbox::new();
  let inner = sb.root().join("repos/inner");
  write_command(&inner, "deep", "echo deep");
  let inner_head = commit_repo(&inner);

  let outer = sb.root().join("repos/outer");
  write_command(&outer, "shallow", "echo shallow");
  write_file(
    &outer.join(".run/init.lua"),
    &format!("run.import('{}')\n", file_url(&inner)),
  );
  commit_repo(&outer);

  let project = sb.project();
  write_file(
    &project.join(".run/init.lua"),
    &format!("run.import('{}')\n", file_url(&outer)),
  );

  let resolution = resolve(sb.root_node(&["deep"]), &sb.importer()).unwrap();

  assert!(resolution.program.ends_with(".run/deep"));
  let lock = fs::read_to_string(project.join(".run/.runlock")).unwrap();
  assert!(lock.contains(&format!("{} {}\n", file_url(&inner), inner_head)));
  assert_eq!(lock.lines().count(), 2);
}
