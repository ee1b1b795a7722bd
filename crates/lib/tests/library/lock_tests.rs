//! Lock file persistence as seen by separate invocations.

use std::fs;

use run_lib::lock::{LockError, LockTable};

use super::common::{Sandbox, write_file};

#[test]
fn writers_keep_each_others_entries() {
  let sb = Sandbox::new();
  let project = sb.project();

  let mut first = LockTable::new();
  first.set("example.org/a", "111");
  let mut second = LockTable::new();
  second.set("example.org/b", "222");

  first.write(&project).unwrap();
  second.write(&project).unwrap();

  assert_eq!(
    fs::read_to_string(LockTable::path_for(&project)).unwrap(),
    "example.org/a 111\nexample.org/b 222\n"
  );
}

#[test]
fn later_writer_wins_on_conflict() {
  let sb = Sandbox::new();
  let project = sb.project();
  write_file(&LockTable::path_for(&project), "example.org/a 111\nexample.org/z 999\n");

  let mut table = LockTable::load(&project).unwrap().unwrap();
  table.set("example.org/a", "222");
  table.write(&project).unwrap();

  let reloaded = LockTable::load(&project).unwrap().unwrap();
  assert_eq!(reloaded.get("example.org/a"), Some("222"));
  assert_eq!(reloaded.get("example.org/z"), Some("999"));
  assert!(!reloaded.is_changed());
}

#[test]
fn malformed_line_reports_its_number() {
  let sb = Sandbox::new();
  let project = sb.project();
  write_file(&LockTable::path_for(&project), "example.org/a 111\n\nexample.org/b\n");

  let err = LockTable::load(&project).unwrap_err();

  assert!(matches!(err, LockError::Parse { line: 3, .. }));
  assert_eq!(err.to_string(), "bad lock (line 3): 'example.org/b'");
}

#[test]
fn missing_file_loads_as_none() {
  let sb = Sandbox::new();
  assert!(LockTable::load(&sb.project()).unwrap().is_none());
}
