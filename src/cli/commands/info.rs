//! `psafe info` — show file metadata from the header.

use crate::cli::output;
use crate::cli::{open_file, resolve_file, Cli};
use crate::errors::Result;

/// Execute the `info` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let (path, _settings) = resolve_file(cli)?;
    let file_data = open_file(&path)?;

    println!("{}", path.display());
    output::detail("Format", &file_data.hdr_version());
    output::detail("File id", &file_data.hdr_uuid());
    output::detail(
        "Created",
        &file_data.created_at().format("%Y-%m-%d %H:%M:%S").to_string(),
    );
    output::detail("Records", &file_data.len().to_string());
    output::detail(
        "Policies",
        &file_data.hdr_policies().len().to_string(),
    );

    if let Some(saved) = file_data.hdr_last_save_time() {
        output::detail("Last saved", &saved.format("%Y-%m-%d %H:%M:%S").to_string());
    }

    let app = file_data.hdr_last_save_app();
    if !app.is_empty() {
        output::detail("Saved by", &app);
    }
    let user = file_data.hdr_last_save_user();
    let host = file_data.hdr_last_save_host();
    if !user.is_empty() || !host.is_empty() {
        output::detail("Saved from", &format!("{user}@{host}"));
    }

    Ok(())
}
