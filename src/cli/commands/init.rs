//! `psafe init` — create a new password file.

use crate::cli::output;
use crate::cli::{prompt_new_passphrase, resolve_file, Cli};
use crate::errors::{PsafeError, Result};
use crate::file::FileData;

/// Execute the `init` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let (path, settings) = resolve_file(cli)?;

    if path.exists() {
        output::tip("Use `psafe add` to put records into the existing file.");
        return Err(PsafeError::FileAlreadyExists(path));
    }

    let passphrase = prompt_new_passphrase()?;

    let mut file_data = FileData::create(
        &path,
        passphrase.as_bytes(),
        Some(&settings.argon2_params()),
    )?;
    file_data.save()?;

    output::success(&format!("Password file created at {}", path.display()));

    crate::cli::log_audit(&path, "init", None, Some("file created"));

    output::tip("Run `psafe add <TITLE>` to add a record.");
    output::tip("Run `psafe list` to see all records.");

    Ok(())
}
