//! Post-creation actions: copying the meeting link to the clipboard.

use tracing::info;

use crate::error::{CliError, CliResult};

/// Copies the meeting link to the system clipboard.
pub fn copy_to_clipboard(link: &str) -> CliResult<()> {
    info!(url = %link, "copying meeting link to clipboard");

    let mut clipboard = arboard::Clipboard::new()
        .map_err(|e| CliError::Action(format!("failed to access clipboard: {}", e)))?;

    clipboard
        .set_text(link)
        .map_err(|e| CliError::Action(format!("failed to copy to clipboard: {}", e)))?;

    Ok(())
}
