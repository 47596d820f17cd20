//! `psafe history` — show or change a record's password history.
//!
//! Usage:
//!   psafe history <QUERY>                # show retained passwords
//!   psafe history <QUERY> --enable      # turn history on
//!   psafe history <QUERY> --max-size 10 # change capacity
//!   psafe history <QUERY> --clear       # drop retained passwords

use crate::cli::output;
use crate::cli::{open_file, resolve_file, Cli};
use crate::errors::{PsafeError, Result};
use crate::file::History;

/// Options carried over from the parsed `history` arguments.
pub struct HistoryArgs {
    pub enable: bool,
    pub disable: bool,
    pub max_size: Option<usize>,
    pub clear: bool,
}

/// Execute the `history` command.
pub fn execute(cli: &Cli, query: &str, args: &HistoryArgs) -> Result<()> {
    let (path, _settings) = resolve_file(cli)?;
    let mut file_data = open_file(&path)?;
    let uuid = file_data.find_record(query)?;
    let ident = file_data.ident(&uuid);

    let changing = args.enable || args.disable || args.max_size.is_some() || args.clear;
    if !changing {
        print_history(&ident, file_data.history(&uuid).as_ref());
        return Ok(());
    }

    if let Some(size) = args.max_size {
        if size > usize::from(u8::MAX) {
            return Err(PsafeError::CommandFailed(format!(
                "history capacity must be at most {}",
                u8::MAX
            )));
        }
    }

    let mut history = file_data
        .history(&uuid)
        .unwrap_or_else(|| History::new(false, 0));

    if args.enable {
        history.set_enabled(true);
        if history.max_size() == 0 && args.max_size.is_none() {
            history.set_max_size(5);
        }
    }
    if args.disable {
        history.set_enabled(false);
    }
    if let Some(size) = args.max_size {
        history.set_max_size(size);
    }
    if args.clear {
        history.clear();
    }

    file_data.set_history(&uuid, Some(&history), true)?;
    file_data.save()?;

    crate::cli::log_audit(&path, "history", Some(&ident), None);
    output::success(&format!(
        "History for '{}': {}, capacity {}",
        ident,
        if history.is_enabled() { "on" } else { "off" },
        history.max_size()
    ));

    Ok(())
}

fn print_history(ident: &str, history: Option<&History>) {
    let Some(history) = history else {
        output::info(&format!("'{ident}' keeps no password history."));
        output::tip("Run `psafe history <QUERY> --enable` to start retaining passwords.");
        return;
    };

    output::info(&format!(
        "History for '{}': {}, capacity {}, {} retained",
        ident,
        if history.is_enabled() { "on" } else { "off" },
        history.max_size(),
        history.entries().len()
    ));

    for entry in history.entries() {
        output::detail(
            &entry.date.format("%Y-%m-%d %H:%M").to_string(),
            &entry.passwd,
        );
    }
}
