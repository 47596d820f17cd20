//! `psafe auth` — manage authentication methods.
//!
//! Subcommands:
//! - `psafe auth keyring`          — save passphrase to OS keyring
//! - `psafe auth keyring --delete` — remove passphrase from keyring
//!
//! When the keyring feature is not compiled in, keyring commands return
//! a helpful error message.

use crate::cli::Cli;
use crate::errors::Result;

/// Execute `psafe auth keyring` — save or delete passphrase in OS keyring.
pub fn execute_keyring(cli: &Cli, delete: bool) -> Result<()> {
    #[cfg(feature = "keyring-store")]
    {
        use crate::cli::output;

        let (path, _settings) = crate::cli::resolve_file(cli)?;
        let file_id = path.to_string_lossy().to_string();

        if delete {
            crate::keyring::delete_passphrase(&file_id)?;
            output::success("Passphrase removed from OS keyring.");
        } else {
            // Verify the passphrase works before storing it.
            // Skip keyring lookup here — user is explicitly setting it.
            let passphrase = crate::cli::prompt_passphrase_for_file(None)?;
            let _file_data = crate::file::FileData::open(&path, passphrase.as_bytes())?;

            crate::keyring::store_passphrase(&file_id, &passphrase)?;
            output::success("Passphrase saved to OS keyring. Future opens will be automatic.");
        }

        Ok(())
    }

    #[cfg(not(feature = "keyring-store"))]
    {
        let _ = (cli, delete);
        Err(crate::errors::PsafeError::KeyringError(
            "keyring support not compiled — rebuild with `cargo build --features keyring-store`"
                .into(),
        ))
    }
}
