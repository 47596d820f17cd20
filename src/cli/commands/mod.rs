//! Command implementations, one module per subcommand.

pub mod add;
pub mod audit_cmd;
pub mod auth;
pub mod completions;
pub mod edit;
pub mod find;
pub mod gen;
pub mod history_cmd;
pub mod info;
pub mod init;
pub mod list;
pub mod passwd;
pub mod policy_cmd;
pub mod reference;
pub mod rm;
pub mod show;
