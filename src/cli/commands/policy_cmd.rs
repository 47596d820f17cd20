//! `psafe policy` — manage the file header's named password policies.
//!
//! Subcommands:
//! - `psafe policy list`                 — names with use counts
//! - `psafe policy show <NAME>`          — one policy in detail
//! - `psafe policy rename <OLD> <NEW>`   — rename, retargeting records

use comfy_table::{ContentArrangement, Table};

use crate::cli::output;
use crate::cli::{open_file, resolve_file, Cli};
use crate::errors::{PsafeError, Result};
use crate::file::PasswdPolicy;

/// Execute `psafe policy list`.
pub fn execute_list(cli: &Cli) -> Result<()> {
    let (path, _settings) = resolve_file(cli)?;
    let file_data = open_file(&path)?;
    let policies = file_data.hdr_policies();

    if policies.is_empty() {
        output::info("This file has no named policies.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Name", "Type", "Length", "Used by"]);

    for (policy, use_count) in policies.iter() {
        table.add_row(vec![
            policy.name().to_string(),
            format!("{:?}", policy.policy_type()),
            policy.length().to_string(),
            format!("{use_count} record(s)"),
        ]);
    }

    println!("{table}");
    Ok(())
}

/// Execute `psafe policy show <NAME>`.
pub fn execute_show(cli: &Cli, name: &str) -> Result<()> {
    let (path, _settings) = resolve_file(cli)?;
    let file_data = open_file(&path)?;
    let policy = file_data
        .hdr_policies()
        .get(name)
        .ok_or_else(|| PsafeError::PolicyNotFound(name.to_string()))?;

    print_policy(policy);

    let used = file_data.hdr_policies().use_count(name).unwrap_or(0);
    output::detail("Used by", &format!("{used} record(s)"));

    Ok(())
}

/// Execute `psafe policy rename <OLD> <NEW>`.
pub fn execute_rename(cli: &Cli, old_name: &str, new_name: &str) -> Result<()> {
    let (path, _settings) = resolve_file(cli)?;
    let mut file_data = open_file(&path)?;

    file_data.rename_hdr_policy(old_name, new_name)?;
    file_data.save()?;

    crate::cli::log_audit(
        &path,
        "policy-rename",
        None,
        Some(&format!("{old_name} -> {new_name}")),
    );
    output::success(&format!("Policy '{old_name}' renamed to '{new_name}'"));

    Ok(())
}

fn print_policy(policy: &PasswdPolicy) {
    println!("{}", policy.name());
    output::detail("Type", &format!("{:?}", policy.policy_type()));
    output::detail("Length", &policy.length().to_string());
    output::detail("Min lower", &policy.min_lowercase().to_string());
    output::detail("Min upper", &policy.min_uppercase().to_string());
    output::detail("Min digits", &policy.min_digits().to_string());
    output::detail("Min symbols", &policy.min_symbols().to_string());
    if let Some(symbols) = policy.special_symbols() {
        output::detail("Symbols", symbols);
    }
}
