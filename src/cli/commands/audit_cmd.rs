//! `psafe audit` — display the audit log.
//!
//! Usage:
//!   psafe audit               # show last 50 entries
//!   psafe audit --last 20     # show last 20
//!   psafe audit --since 7d    # entries from last 7 days
//!
//! Only built with the `audit-log` feature; without it the command
//! returns an explanatory error.

use crate::cli::{resolve_file, Cli};
use crate::errors::{PsafeError, Result};

/// Execute the `audit` command.
#[cfg(feature = "audit-log")]
pub fn execute(cli: &Cli, last: usize, since: Option<&str>) -> Result<()> {
    use crate::audit::AuditLog;
    use crate::cli::output;

    let (path, _settings) = resolve_file(cli)?;

    let audit = AuditLog::open(&path)
        .ok_or_else(|| PsafeError::AuditError("failed to open audit database".into()))?;

    let since_dt = match since {
        Some(s) => Some(parse_duration(s)?),
        None => None,
    };

    let entries = audit.query(last, since_dt)?;

    if entries.is_empty() {
        output::info("No audit entries found.");
        return Ok(());
    }

    print_audit_table(&entries);

    Ok(())
}

#[cfg(not(feature = "audit-log"))]
pub fn execute(cli: &Cli, _last: usize, _since: Option<&str>) -> Result<()> {
    let _ = resolve_file(cli)?;
    Err(PsafeError::AuditError(
        "audit support not compiled — rebuild with the default `audit-log` feature".into(),
    ))
}

/// Parse a human-friendly duration string like "7d", "24h", "30m".
#[cfg(feature = "audit-log")]
fn parse_duration(input: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    let input = input.trim();

    let (num_str, unit) = if let Some(s) = input.strip_suffix('d') {
        (s, 'd')
    } else if let Some(s) = input.strip_suffix('h') {
        (s, 'h')
    } else if let Some(s) = input.strip_suffix('m') {
        (s, 'm')
    } else {
        return Err(PsafeError::CommandFailed(format!(
            "invalid duration '{input}' — use format like 7d, 24h, or 30m"
        )));
    };

    let num: i64 = num_str.parse().map_err(|_| {
        PsafeError::CommandFailed(format!(
            "invalid duration '{input}' — number part is not valid"
        ))
    })?;

    let duration = match unit {
        'd' => chrono::Duration::days(num),
        'h' => chrono::Duration::hours(num),
        'm' => chrono::Duration::minutes(num),
        _ => unreachable!(),
    };

    Ok(chrono::Utc::now() - duration)
}

/// Print audit entries in a formatted table.
#[cfg(feature = "audit-log")]
fn print_audit_table(entries: &[crate::audit::AuditEntry]) {
    use comfy_table::{ContentArrangement, Table};
    use console::style;

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Time", "Operation", "Record", "Details"]);

    for entry in entries {
        let time = entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string();
        let op = colorize_operation(&entry.operation);
        let record = entry.record.as_deref().unwrap_or("-");
        let details = entry.details.as_deref().unwrap_or("-");

        table.add_row(vec![time, op, record.to_string(), details.to_string()]);
    }

    println!(
        "{}",
        style(format!("{} audit entries:", entries.len())).bold()
    );
    println!("{table}");
}

/// Colorize operation names for display.
#[cfg(feature = "audit-log")]
fn colorize_operation(op: &str) -> String {
    use console::style;

    match op {
        "init" | "add" => style(op).green().to_string(),
        "edit" | "history" => style(op).blue().to_string(),
        "rm" => style(op).red().to_string(),
        "passwd" => style(op).yellow().to_string(),
        "alias" | "shortcut" => style(op).cyan().to_string(),
        "policy-rename" => style(op).magenta().to_string(),
        _ => op.to_string(),
    }
}

#[cfg(all(test, feature = "audit-log"))]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn parse_duration_days() {
        let dt = parse_duration("7d").unwrap();
        let diff = Utc::now() - dt;
        // Should be roughly 7 days (within a few seconds).
        assert!((diff.num_days() - 7).abs() <= 1);
    }

    #[test]
    fn parse_duration_hours() {
        let dt = parse_duration("24h").unwrap();
        let diff = Utc::now() - dt;
        assert!((diff.num_hours() - 24).abs() <= 1);
    }

    #[test]
    fn parse_duration_minutes() {
        let dt = parse_duration("30m").unwrap();
        let diff = Utc::now() - dt;
        assert!((diff.num_minutes() - 30).abs() <= 1);
    }

    #[test]
    fn parse_duration_invalid() {
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("7x").is_err());
        assert!(parse_duration("d").is_err());
    }

    #[test]
    fn colorize_operation_returns_string() {
        // Just verify it doesn't panic for known and unknown operations.
        assert!(!colorize_operation("init").is_empty());
        assert!(!colorize_operation("add").is_empty());
        assert!(!colorize_operation("unknown").is_empty());
    }
}
