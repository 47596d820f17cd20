//! `psafe list` — display all records in a table.

use crate::cli::output::{self, RecordRow};
use crate::cli::{open_file, resolve_file, Cli};
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let (path, _settings) = resolve_file(cli)?;
    let file_data = open_file(&path)?;

    output::info(&format!(
        "{} — {} record(s)",
        path.display(),
        file_data.len()
    ));

    // Sort by group, then title, for a stable listing.
    let mut rows: Vec<RecordRow> = file_data
        .uuids()
        .iter()
        .map(|uuid| RecordRow {
            uuid: uuid.simple().to_string()[..8].to_string(),
            group: file_data.group(uuid).unwrap_or_default(),
            title: file_data.title(uuid).unwrap_or_default(),
            username: file_data.username(uuid).unwrap_or_default(),
            kind: file_data.record_type(uuid).to_string(),
        })
        .collect();
    rows.sort_by(|a, b| (&a.group, &a.title).cmp(&(&b.group, &b.title)));

    output::print_records_table(&rows);

    Ok(())
}
