//! CLI module — Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::{Path, PathBuf};

use clap::Parser;

use zeroize::Zeroizing;

use crate::config::Settings;
use crate::errors::{PsafeError, Result};
use crate::file::FileData;

/// Minimum passphrase length to prevent trivially weak master passphrases.
const MIN_PASSPHRASE_LEN: usize = 8;

/// psafe CLI: encrypted password safe with versioned record schemas.
#[derive(Parser)]
#[command(name = "psafe", about = "Local-first encrypted password safe", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Password file to use (default: .psafe.toml `default_file`,
    /// then `passwords.psdb`)
    #[arg(short, long, global = true)]
    pub file: Option<String>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create a new password file
    Init,

    /// List all records
    List,

    /// Show one record's details
    Show {
        /// Record title or UUID prefix
        query: String,
        /// Print the password instead of masking it
        #[arg(long)]
        password: bool,
        /// Copy the password to the clipboard
        #[arg(long)]
        copy: bool,
    },

    /// Add a record
    Add {
        /// Record title
        title: String,
        #[arg(short, long)]
        group: Option<String>,
        #[arg(short, long)]
        username: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Password value (omit for interactive prompt)
        #[arg(short, long)]
        password: Option<String>,
        /// Generate the password instead of prompting
        #[arg(long, conflicts_with = "password")]
        generate: bool,
    },

    /// Edit a record's fields
    Edit {
        /// Record title or UUID prefix
        query: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        group: Option<String>,
        #[arg(short, long)]
        username: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        notes: Option<String>,
        /// Clear the group field
        #[arg(long)]
        clear_group: bool,
        /// Clear the username field
        #[arg(long)]
        clear_username: bool,
        /// Clear the URL field
        #[arg(long)]
        clear_url: bool,
        /// Clear the email field
        #[arg(long)]
        clear_email: bool,
        /// Clear the notes field
        #[arg(long)]
        clear_notes: bool,
        /// Protect the record against edits and deletion
        #[arg(long, conflicts_with = "unprotect")]
        protect: bool,
        /// Remove the record's protection
        #[arg(long)]
        unprotect: bool,
    },

    /// Remove a record
    Rm {
        /// Record title or UUID prefix
        query: String,
        /// Skip confirmation prompt
        #[arg(short = 'F', long)]
        force: bool,
    },

    /// Change a record's password
    Passwd {
        /// Record title or UUID prefix
        query: String,
        /// Generate the new password from the record's policy
        #[arg(long)]
        generate: bool,
    },

    /// Generate passwords without touching any record
    Gen {
        /// Password length
        #[arg(short, long, default_value = "12")]
        length: u32,
        /// Use a named policy from the file header instead of flags
        #[arg(short, long)]
        policy: Option<String>,
        /// How many passwords to print
        #[arg(short, long, default_value = "1")]
        count: usize,
        /// Generate pronounceable passwords
        #[arg(long, conflicts_with_all = ["easy", "hex"])]
        pronounceable: bool,
        /// Avoid easily confused characters
        #[arg(long, conflicts_with = "hex")]
        easy: bool,
        /// Generate hexadecimal passwords
        #[arg(long)]
        hex: bool,
        /// Leave out uppercase letters
        #[arg(long)]
        no_upper: bool,
        /// Leave out digits
        #[arg(long)]
        no_digits: bool,
        /// Leave out symbols
        #[arg(long)]
        no_symbols: bool,
        /// Symbol set to draw from
        #[arg(long)]
        symbols: Option<String>,
    },

    /// Show or change a record's password history
    History {
        /// Record title or UUID prefix
        query: String,
        /// Turn history on
        #[arg(long, conflicts_with = "disable")]
        enable: bool,
        /// Turn history off
        #[arg(long)]
        disable: bool,
        /// Change the history capacity (0-255)
        #[arg(long)]
        max_size: Option<usize>,
        /// Drop all retained passwords
        #[arg(long)]
        clear: bool,
    },

    /// Manage the file's named password policies
    Policy {
        #[command(subcommand)]
        action: PolicyAction,
    },

    /// Make a record an alias of another record
    Alias {
        /// Record title or UUID prefix
        query: String,
        /// Target record title or UUID prefix
        target: String,
    },

    /// Make a record a shortcut to another record
    Shortcut {
        /// Record title or UUID prefix
        query: String,
        /// Target record title or UUID prefix
        target: String,
    },

    /// Search records with a regular expression
    Find {
        /// Pattern matched against title, group, username, URL, email, notes
        pattern: String,
        /// Match case-sensitively
        #[arg(long)]
        case_sensitive: bool,
    },

    /// Show file metadata
    Info,

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell)
        shell: String,
    },

    /// View the audit log of file operations
    Audit {
        /// Number of entries to show (default: 50)
        #[arg(long, default_value = "50")]
        last: usize,
        /// Show entries since a duration ago (e.g. 7d, 24h, 30m)
        #[arg(long)]
        since: Option<String>,
    },

    /// Manage authentication methods (keyring)
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
}

/// Policy subcommands.
#[derive(clap::Subcommand)]
pub enum PolicyAction {
    /// List the header's named policies with use counts
    List,

    /// Show one named policy in detail
    Show {
        /// Policy name
        name: String,
    },

    /// Rename a named policy, retargeting every record that uses it
    Rename {
        /// Current policy name
        old_name: String,
        /// New policy name
        new_name: String,
    },
}

/// Auth subcommands for keyring management.
#[derive(clap::Subcommand)]
pub enum AuthAction {
    /// Save the file passphrase to the OS keyring (auto-unlock)
    Keyring {
        /// Remove the passphrase from the keyring instead of saving
        #[arg(long)]
        delete: bool,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Resolve the password file path for this run: `--file` wins, then the
/// `.psafe.toml` default, then `passwords.psdb` in the working
/// directory.  Also returns the loaded settings.
pub fn resolve_file(cli: &Cli) -> Result<(PathBuf, Settings)> {
    let cwd = std::env::current_dir()?;
    let settings = Settings::load(&cwd)?;
    let path = settings.file_path(&cwd, cli.file.as_deref());
    Ok((path, settings))
}

/// Get the file passphrase, trying in order:
/// 1. `PSAFE_PASSWORD` env var (CI/scripting)
/// 2. OS keyring (if compiled with `keyring-store` feature)
/// 3. Interactive prompt
///
/// Returns `Zeroizing<String>` so the passphrase is wiped from memory on drop.
pub fn prompt_passphrase_for_file(file_id: Option<&str>) -> Result<Zeroizing<String>> {
    // 1. Check the environment variable first (CI/scripting friendly).
    if let Ok(pw) = std::env::var("PSAFE_PASSWORD") {
        if !pw.is_empty() {
            return Ok(Zeroizing::new(pw));
        }
    }

    // 2. Try the OS keyring (if feature enabled and a file id provided).
    #[cfg(feature = "keyring-store")]
    if let Some(id) = file_id {
        match crate::keyring::get_passphrase(id) {
            Ok(Some(pw)) => return Ok(Zeroizing::new(pw)),
            Ok(None) => {} // No stored passphrase, continue to prompt.
            Err(_) => {}   // Keyring unavailable, continue to prompt.
        }
    }

    // Suppress unused variable warning when keyring feature is off.
    #[cfg(not(feature = "keyring-store"))]
    let _ = file_id;

    // 3. Fall back to interactive prompt.
    let pw = dialoguer::Password::new()
        .with_prompt("Enter file passphrase")
        .interact()
        .map_err(|e| PsafeError::CommandFailed(format!("passphrase prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new passphrase with confirmation (used during `init`).
///
/// Also respects `PSAFE_PASSWORD` for scripted/CI usage.
/// Enforces a minimum passphrase length.
///
/// Returns `Zeroizing<String>` so the passphrase is wiped from memory on drop.
pub fn prompt_new_passphrase() -> Result<Zeroizing<String>> {
    // Check the environment variable first (CI/scripting friendly).
    if let Ok(pw) = std::env::var("PSAFE_PASSWORD") {
        if !pw.is_empty() {
            if pw.len() < MIN_PASSPHRASE_LEN {
                return Err(PsafeError::CommandFailed(format!(
                    "passphrase must be at least {MIN_PASSPHRASE_LEN} characters"
                )));
            }
            return Ok(Zeroizing::new(pw));
        }
    }

    loop {
        let passphrase = dialoguer::Password::new()
            .with_prompt("Choose file passphrase")
            .with_confirmation(
                "Confirm file passphrase",
                "Passphrases do not match, try again",
            )
            .interact()
            .map_err(|e| PsafeError::CommandFailed(format!("passphrase prompt: {e}")))?;

        if passphrase.len() < MIN_PASSPHRASE_LEN {
            output::warning(&format!(
                "Passphrase must be at least {MIN_PASSPHRASE_LEN} characters. Try again."
            ));
            continue;
        }

        return Ok(Zeroizing::new(passphrase));
    }
}

/// Open the file at `path` with passphrase resolution.
pub fn open_file(path: &Path) -> Result<FileData> {
    let file_id = path.to_string_lossy();
    let passphrase = prompt_passphrase_for_file(Some(&file_id))?;
    FileData::open(path, passphrase.as_bytes())
}

/// Log an audit event for a password file.  A no-op build without the
/// `audit-log` feature.
pub fn log_audit(path: &Path, op: &str, record: Option<&str>, details: Option<&str>) {
    #[cfg(feature = "audit-log")]
    crate::audit::log_audit(path, op, record, details);

    #[cfg(not(feature = "audit-log"))]
    let _ = (path, op, record, details);
}
