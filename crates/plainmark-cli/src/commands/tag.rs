//! Tag command handlers

use anyhow::Result;

use plainmark_core::Store;

use crate::output::Output;

/// List all tags with usage counts
pub fn list(store: &Store, output: &Output) -> Result<()> {
    output.print_tags(&store.tags_with_counts());
    Ok(())
}
