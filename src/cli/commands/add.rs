//! `psafe add` — add a record to the file.

use std::io::{self, IsTerminal, Read};

use rand::rng;

use crate::cli::output;
use crate::cli::{open_file, resolve_file, Cli};
use crate::config::Settings;
use crate::errors::{PsafeError, Result};
use crate::file::{History, Location, PasswdPolicy, PolicyContext};

/// Options carried over from the parsed `add` arguments.
pub struct AddArgs<'a> {
    pub title: &'a str,
    pub group: Option<&'a str>,
    pub username: Option<&'a str>,
    pub url: Option<&'a str>,
    pub email: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub password: Option<&'a str>,
    pub generate: bool,
}

/// Execute the `add` command.
pub fn execute(cli: &Cli, args: &AddArgs<'_>) -> Result<()> {
    let (path, settings) = resolve_file(cli)?;
    let mut file_data = open_file(&path)?;

    // Determine the password from one of four sources.
    let passwd = if let Some(p) = args.password {
        // Source 1: Inline value on the command line.
        output::warning("Password provided on command line — it may appear in shell history.");
        p.to_string()
    } else if args.generate {
        // Source 2: Generated from the default policy.
        let policy = PasswdPolicy::new("", Location::Default);
        let mut rng = rng();
        let mut ctx = PolicyContext::new(&mut rng, settings.default_symbols.as_deref());
        policy.generate(&mut ctx)
    } else if !io::stdin().is_terminal() {
        // Source 3: Piped input (stdin is not a terminal).
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf.trim_end().to_string()
    } else {
        // Source 4: Interactive secure prompt (default).
        dialoguer::Password::new()
            .with_prompt(format!("Password for '{}'", args.title))
            .interact()
            .map_err(|e| PsafeError::CommandFailed(format!("input prompt: {e}")))?
    };

    let uuid = file_data.add_record()?;
    file_data.set_title(&uuid, Some(args.title))?;
    file_data.set_group(&uuid, args.group)?;
    file_data.set_username(&uuid, args.username)?;
    file_data.set_url(&uuid, args.url)?;
    file_data.set_email(&uuid, args.email)?;
    file_data.set_notes(&uuid, args.notes)?;
    file_data.set_password(&uuid, &passwd)?;
    enable_history(&mut file_data, &uuid, &settings)?;
    file_data.save()?;

    let ident = file_data.ident(&uuid);
    crate::cli::log_audit(&path, "add", Some(&ident), Some("record added"));
    output::success(&format!(
        "Added '{}' ({} record(s) total)",
        ident,
        file_data.len()
    ));

    if args.generate {
        output::tip("Run `psafe show <TITLE> --password` to see the generated password.");
    }

    Ok(())
}

/// Turn on password history for new records per the configured capacity.
fn enable_history(
    file_data: &mut crate::file::FileData,
    uuid: &uuid::Uuid,
    settings: &Settings,
) -> Result<()> {
    if settings.new_record_history_size == 0 {
        return Ok(());
    }
    let history = History::new(true, settings.new_record_history_size);
    file_data.set_history(uuid, Some(&history), false)
}
