//! `psafe alias` / `psafe shortcut` — point one record's password at
//! another record.
//!
//! An alias exposes the target's details wholesale; a shortcut keeps its
//! own details and borrows only the password.  Both are stored as a
//! special password payload, so either command works on any existing
//! record.

use crate::cli::output;
use crate::cli::{open_file, resolve_file, Cli};
use crate::errors::Result;
use crate::file::RecordType;

/// Execute `psafe alias <QUERY> <TARGET>` or
/// `psafe shortcut <QUERY> <TARGET>`.
pub fn execute(cli: &Cli, query: &str, target: &str, rec_type: RecordType) -> Result<()> {
    let (path, _settings) = resolve_file(cli)?;
    let mut file_data = open_file(&path)?;

    let uuid = file_data.find_record(query)?;
    let target_uuid = file_data.find_record(target)?;

    file_data.set_reference(&uuid, &target_uuid, rec_type)?;
    file_data.save()?;

    let ident = file_data.ident(&uuid);
    // The engine flattens chains, so report the actual base target.
    let base = file_data
        .passwd_record(&uuid)
        .and_then(|r| r.ref_uuid().copied())
        .unwrap_or(target_uuid);
    let target_ident = file_data.ident(&base);

    crate::cli::log_audit(
        &path,
        &rec_type.to_string(),
        Some(&ident),
        Some(&format!("-> {target_ident}")),
    );
    output::success(&format!("'{ident}' is now a {rec_type} of '{target_ident}'"));

    Ok(())
}
