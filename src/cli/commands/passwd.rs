//! `psafe passwd` — change a record's password.

use std::io::{self, IsTerminal, Read};

use rand::rng;

use crate::cli::output;
use crate::cli::{open_file, resolve_file, Cli};
use crate::errors::{PsafeError, Result};
use crate::file::{Location, PasswdPolicy, PolicyContext};

/// Execute the `passwd` command.
pub fn execute(cli: &Cli, query: &str, generate: bool) -> Result<()> {
    let (path, settings) = resolve_file(cli)?;
    let mut file_data = open_file(&path)?;
    let uuid = file_data.find_record(query)?;
    let ident = file_data.ident(&uuid);

    let new_passwd = if generate {
        // The record's own policy (resolved against the header's named
        // list) wins; fall back to the standard policy.
        let policy = file_data
            .resolved_policy(&uuid)
            .unwrap_or_else(|| PasswdPolicy::new("", Location::Default));
        let mut rng = rng();
        let mut ctx = PolicyContext::new(&mut rng, settings.default_symbols.as_deref());
        policy.generate(&mut ctx)
    } else if !io::stdin().is_terminal() {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf.trim_end().to_string()
    } else {
        dialoguer::Password::new()
            .with_prompt(format!("New password for '{ident}'"))
            .with_confirmation("Confirm new password", "Passwords do not match, try again")
            .interact()
            .map_err(|e| PsafeError::CommandFailed(format!("input prompt: {e}")))?
    };

    file_data.set_password(&uuid, &new_passwd)?;
    file_data.save()?;

    crate::cli::log_audit(&path, "passwd", Some(&ident), None);
    output::success(&format!("Password changed for '{ident}'"));
    if generate {
        output::tip("Run `psafe show <QUERY> --password` to see the new password.");
    }

    Ok(())
}
