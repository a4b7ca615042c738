//! Check command handler

use anyhow::{bail, Result};

use plainmark_core::Store;

use crate::output::Output;

/// Report entries that could not be parsed
///
/// Fails when there is anything to report, so it can gate commits.
pub fn check(store: &Store, output: &Output) -> Result<()> {
    let warnings = store.warnings();

    if warnings.is_empty() {
        output.success(&format!(
            "{}: {} bookmark(s), no problems found",
            store.path().display(),
            store.len()
        ));
        return Ok(());
    }

    output.print_warnings(warnings);
    bail!(
        "{}: {} problem(s) found",
        store.path().display(),
        warnings.len()
    )
}
