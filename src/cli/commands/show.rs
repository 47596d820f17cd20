//! `psafe show` — display one record's details.

use chrono::{DateTime, Utc};

use crate::cli::output;
use crate::cli::{open_file, resolve_file, Cli};
use crate::errors::{PsafeError, Result};
use crate::file::RecordType;

/// Execute the `show` command.
pub fn execute(cli: &Cli, query: &str, show_password: bool, copy: bool) -> Result<()> {
    let (path, _settings) = resolve_file(cli)?;
    let file_data = open_file(&path)?;
    let uuid = file_data.find_record(query)?;

    println!("{}", file_data.ident(&uuid));
    output::detail("Id", &uuid.to_string());

    let rec_type = file_data.record_type(&uuid);
    if rec_type != RecordType::Normal {
        let target = file_data
            .passwd_record(&uuid)
            .and_then(|r| r.ref_uuid().copied());
        if let Some(target) = target {
            output::detail(
                &capitalize(&rec_type.to_string()),
                &format!("\u{2192} {}", file_data.ident(&target)),
            );
        }
    }

    detail_opt("Group", file_data.group(&uuid));
    detail_opt("Username", file_data.username(&uuid));
    detail_opt("URL", file_data.url(&uuid));
    detail_opt("Email", file_data.email(&uuid));

    if show_password {
        let passwd = file_data
            .password(&uuid)
            .ok_or_else(|| PsafeError::RecordNotFound(query.to_string()))?;
        output::detail("Password", &passwd);
    } else {
        output::detail("Password", "********");
    }

    if let Some(expiry) = file_data.passwd_expiry(&uuid) {
        let mut line = format_time(expiry.expiration);
        if expiry.is_expired(Utc::now()) {
            line.push_str(" (expired)");
        } else if expiry.recurring {
            line.push_str(&format!(" (every {} days)", expiry.interval));
        }
        output::detail("Expires", &line);
    }

    detail_opt("Notes", file_data.notes(&uuid));

    if let Some(created) = file_data.creation_time(&uuid) {
        output::detail("Created", &format_time(created));
    }
    if let Some(modified) = file_data.passwd_mod_time(&uuid) {
        output::detail("Pw changed", &format_time(modified));
    }

    if copy {
        let passwd = file_data
            .password(&uuid)
            .ok_or_else(|| PsafeError::RecordNotFound(query.to_string()))?;
        let mut clipboard = arboard::Clipboard::new()
            .map_err(|e| PsafeError::CommandFailed(format!("clipboard unavailable: {e}")))?;
        clipboard
            .set_text(passwd)
            .map_err(|e| PsafeError::CommandFailed(format!("clipboard write: {e}")))?;
        output::success("Password copied to clipboard.");
    }

    Ok(())
}

fn detail_opt(label: &str, value: Option<String>) {
    if let Some(v) = value {
        if !v.is_empty() {
            output::detail(label, &v);
        }
    }
}

fn format_time(t: DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
