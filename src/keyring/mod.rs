//! OS keyring integration for passphrase caching.
//!
//! Stores and retrieves the password-file passphrase from the operating
//! system's secure credential store:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring / KDE Wallet)
//!
//! All operations fail gracefully — if the keyring is unavailable, the
//! error is returned and the caller falls back to a passphrase prompt.

use crate::errors::{PsafeError, Result};

/// Service name used in the OS keyring.
const SERVICE_NAME: &str = "psafe";

/// Build a keyring entry key from a password-file path.
///
/// Callers pass the canonical path so that different relative paths to
/// the same file resolve to the same keyring entry.
fn entry_key(file_path: &str) -> String {
    format!("file:{file_path}")
}

/// Store a passphrase in the OS keyring for a specific file.
pub fn store_passphrase(file_path: &str, passphrase: &str) -> Result<()> {
    let entry = keyring::Entry::new(SERVICE_NAME, &entry_key(file_path))
        .map_err(|e| PsafeError::KeyringError(format!("failed to create keyring entry: {e}")))?;

    entry.set_password(passphrase).map_err(|e| {
        PsafeError::KeyringError(format!("failed to store passphrase in keyring: {e}"))
    })?;

    Ok(())
}

/// Retrieve a passphrase from the OS keyring for a specific file.
///
/// Returns `None` if no passphrase is stored (rather than an error).
pub fn get_passphrase(file_path: &str) -> Result<Option<String>> {
    let entry = keyring::Entry::new(SERVICE_NAME, &entry_key(file_path))
        .map_err(|e| PsafeError::KeyringError(format!("failed to create keyring entry: {e}")))?;

    match entry.get_password() {
        Ok(passphrase) => Ok(Some(passphrase)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(e) => Err(PsafeError::KeyringError(format!(
            "failed to read from keyring: {e}"
        ))),
    }
}

/// Delete a stored passphrase from the OS keyring.
pub fn delete_passphrase(file_path: &str) -> Result<()> {
    let entry = keyring::Entry::new(SERVICE_NAME, &entry_key(file_path))
        .map_err(|e| PsafeError::KeyringError(format!("failed to create keyring entry: {e}")))?;

    match entry.delete_credential() {
        Ok(()) => Ok(()),
        Err(keyring::Error::NoEntry) => Ok(()), // Already gone, that's fine.
        Err(e) => Err(PsafeError::KeyringError(format!(
            "failed to delete from keyring: {e}"
        ))),
    }
}
