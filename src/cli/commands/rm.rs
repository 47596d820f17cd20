//! `psafe rm` — remove a record from the file.

use dialoguer::Confirm;

use crate::cli::output;
use crate::cli::{open_file, resolve_file, Cli};
use crate::errors::{PsafeError, Result};

/// Execute the `rm` command.
pub fn execute(cli: &Cli, query: &str, force: bool) -> Result<()> {
    let (path, _settings) = resolve_file(cli)?;
    let mut file_data = open_file(&path)?;
    let uuid = file_data.find_record(query)?;
    let ident = file_data.ident(&uuid);

    // Unless --force is set, ask for confirmation before deleting.
    if !force {
        let confirmed = Confirm::new()
            .with_prompt(format!("Delete record '{ident}'?"))
            .default(false)
            .interact()
            .map_err(|e| PsafeError::CommandFailed(format!("confirm prompt: {e}")))?;

        if !confirmed {
            output::info("Cancelled.");
            return Ok(());
        }
    }

    file_data.remove_record(&uuid)?;
    file_data.save()?;

    crate::cli::log_audit(&path, "rm", Some(&ident), None);
    output::success(&format!("Deleted record '{ident}'"));

    Ok(())
}
