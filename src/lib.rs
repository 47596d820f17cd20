pub mod cli;
pub mod config;
pub mod container;
pub mod crypto;
pub mod errors;
pub mod file;

#[cfg(feature = "audit-log")]
pub mod audit;

#[cfg(feature = "keyring-store")]
pub mod keyring;
