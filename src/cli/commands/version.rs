//! `vultitool version` — display version.

use crate::errors::Result;

/// Execute the `version` command.
pub fn execute() -> Result<()> {
    println!("vultitool {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
