//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

/// One row in the record listing table.
pub struct RecordRow {
    pub uuid: String,
    pub group: String,
    pub title: String,
    pub username: String,
    pub kind: String,
}

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    println!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    println!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    println!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print a table of records (Id, Group, Title, Username, Type).
pub fn print_records_table(rows: &[RecordRow]) {
    if rows.is_empty() {
        info("No records in this file yet.");
        tip("Run `psafe add <TITLE>` to add your first record.");
        return;
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Id", "Group", "Title", "Username", "Type"]);

    for r in rows {
        table.add_row(vec![
            r.uuid.clone(),
            r.group.clone(),
            r.title.clone(),
            r.username.clone(),
            r.kind.clone(),
        ]);
    }

    println!("{table}");
}

/// Print a single labeled detail line with a dim label column.
pub fn detail(label: &str, value: &str) {
    println!("  {:<12} {}", style(label).dim(), value);
}
