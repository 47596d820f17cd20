//! `psafe edit` — change a record's fields in place.

use crate::cli::output;
use crate::cli::{open_file, resolve_file, Cli};
use crate::errors::Result;

/// Options carried over from the parsed `edit` arguments.
#[derive(Default)]
pub struct EditArgs<'a> {
    pub title: Option<&'a str>,
    pub group: Option<&'a str>,
    pub username: Option<&'a str>,
    pub url: Option<&'a str>,
    pub email: Option<&'a str>,
    pub notes: Option<&'a str>,
    pub clear_group: bool,
    pub clear_username: bool,
    pub clear_url: bool,
    pub clear_email: bool,
    pub clear_notes: bool,
    pub protect: bool,
    pub unprotect: bool,
}

impl EditArgs<'_> {
    fn is_noop(&self) -> bool {
        self.title.is_none()
            && self.group.is_none()
            && self.username.is_none()
            && self.url.is_none()
            && self.email.is_none()
            && self.notes.is_none()
            && !self.clear_group
            && !self.clear_username
            && !self.clear_url
            && !self.clear_email
            && !self.clear_notes
            && !self.protect
            && !self.unprotect
    }
}

/// Execute the `edit` command.
pub fn execute(cli: &Cli, query: &str, args: &EditArgs<'_>) -> Result<()> {
    if args.is_noop() {
        output::info("Nothing to change.");
        output::tip("Pass a field flag, e.g. `psafe edit <QUERY> --username alice`.");
        return Ok(());
    }

    let (path, _settings) = resolve_file(cli)?;
    let mut file_data = open_file(&path)?;
    let uuid = file_data.find_record(query)?;

    // Unprotect first so a protected record can be edited in one call.
    if args.unprotect {
        file_data.set_protected(&uuid, false)?;
    }

    if let Some(title) = args.title {
        file_data.set_title(&uuid, Some(title))?;
    }
    set_or_clear(args.group, args.clear_group, |v| {
        file_data.set_group(&uuid, v)
    })?;
    set_or_clear(args.username, args.clear_username, |v| {
        file_data.set_username(&uuid, v)
    })?;
    set_or_clear(args.url, args.clear_url, |v| file_data.set_url(&uuid, v))?;
    set_or_clear(args.email, args.clear_email, |v| {
        file_data.set_email(&uuid, v)
    })?;
    set_or_clear(args.notes, args.clear_notes, |v| {
        file_data.set_notes(&uuid, v)
    })?;

    if args.protect {
        file_data.set_protected(&uuid, true)?;
    }

    file_data.save()?;

    let ident = file_data.ident(&uuid);
    crate::cli::log_audit(&path, "edit", Some(&ident), None);
    output::success(&format!("Updated '{ident}'"));

    Ok(())
}

/// Apply a set-or-clear pair: an explicit value wins, a clear flag
/// writes None, neither leaves the field alone.
fn set_or_clear<F>(value: Option<&str>, clear: bool, mut write: F) -> Result<()>
where
    F: FnMut(Option<&str>) -> Result<()>,
{
    if let Some(v) = value {
        write(Some(v))
    } else if clear {
        write(None)
    } else {
        Ok(())
    }
}
