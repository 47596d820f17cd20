//! `psafe find` — search records with a regular expression.

use crate::cli::output::{self, RecordRow};
use crate::cli::{open_file, resolve_file, Cli};
use crate::errors::Result;
use crate::file::RecordFilter;

/// Execute the `find` command.
pub fn execute(cli: &Cli, pattern: &str, case_sensitive: bool) -> Result<()> {
    let filter = RecordFilter::new(pattern, case_sensitive)?;

    let (path, _settings) = resolve_file(cli)?;
    let file_data = open_file(&path)?;

    let matches = file_data.search(&filter);
    if matches.is_empty() {
        output::info("No records match.");
        return Ok(());
    }

    let mut rows: Vec<RecordRow> = matches
        .iter()
        .map(|(uuid, field)| RecordRow {
            uuid: uuid.simple().to_string()[..8].to_string(),
            group: file_data.group(uuid).unwrap_or_default(),
            title: file_data.title(uuid).unwrap_or_default(),
            username: file_data.username(uuid).unwrap_or_default(),
            kind: format!("matched {field}"),
        })
        .collect();
    rows.sort_by(|a, b| (&a.group, &a.title).cmp(&(&b.group, &b.title)));

    output::info(&format!("{} record(s) match:", rows.len()));
    output::print_records_table(&rows);

    Ok(())
}
