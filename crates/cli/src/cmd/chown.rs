use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use run_lib::chown::{UserMapping, chown_tree};

/// Apply each ownership mapping to the tree under `root`, in order.
pub fn cmd_chown(root: &Path, mappings: &[UserMapping]) -> Result<()> {
  for mapping in mappings {
    let changed = chown_tree(root, mapping).with_context(|| {
      format!(
        "failed to remap {}:{} to {}:{}",
        mapping.from.uid, mapping.from.gid, mapping.to.uid, mapping.to.gid
      )
    })?;
    info!(changed, "ownership remapped");
  }
  Ok(())
}
