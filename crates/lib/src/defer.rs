//! Deferred cleanup actions.
//!
//! A [`DeferList`] collects actions (temporary directory removal and the like)
//! that must run when the process finishes, whether it returns normally or is
//! interrupted. Actions run last-registered first. Clones share the same list,
//! so an interrupt listener can hold a handle without reaching into globals.

use std::sync::{Arc, Mutex};

use tracing::debug;

type Action = Box<dyn FnOnce() + Send>;

#[derive(Clone, Default)]
pub struct DeferList {
  actions: Arc<Mutex<Vec<Action>>>,
}

impl DeferList {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register an action. It runs before every action registered earlier.
  pub fn add(&self, action: impl FnOnce() + Send + 'static) {
    let mut actions = self.actions.lock().unwrap_or_else(|e| e.into_inner());
    actions.push(Box::new(action));
  }

  /// Run and drain every registered action, most recent first.
  ///
  /// Safe to call more than once; later calls only see newly added actions.
  pub fn run(&self) {
    let drained: Vec<Action> = {
      let mut actions = self.actions.lock().unwrap_or_else(|e| e.into_inner());
      std::mem::take(&mut *actions)
    };
    debug!(count = drained.len(), "running deferred actions");
    for action in drained.into_iter().rev() {
      action();
    }
  }

  pub fn len(&self) -> usize {
    self.actions.lock().map(|a| a.len()).unwrap_or(0)
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }
}

impl std::fmt::Debug for DeferList {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("DeferList").field("pending", &self.len()).finish()
  }
}
