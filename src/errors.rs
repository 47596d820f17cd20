use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in psafe.
#[derive(Debug, Error)]
pub enum PsafeError {
    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Invalid passphrase or corrupted file")]
    InvalidPassphrase,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Container errors ---
    #[error("Password file not found at {0}")]
    FileNotFound(PathBuf),

    #[error("Password file already exists at {0}")]
    FileAlreadyExists(PathBuf),

    #[error("Invalid container format: {0}")]
    InvalidContainer(String),

    #[error("Unsupported container version {0}")]
    UnsupportedContainer(u8),

    // --- Field encoding errors ---
    #[error("Malformed {what}: {detail}")]
    Format { what: &'static str, detail: String },

    // --- Record errors ---
    #[error("Record '{0}' not found")]
    RecordNotFound(String),

    #[error("Record '{0}' is referenced by {1} other record(s)")]
    RecordHasReferences(String, usize),

    #[error("Record '{0}' is protected")]
    RecordProtected(String),

    #[error("Ambiguous record query '{0}': matches {1}")]
    AmbiguousRecord(String, String),

    #[error("File is read-only")]
    ReadOnly,

    // --- Policy errors ---
    #[error("Named policy '{0}' not found")]
    PolicyNotFound(String),

    #[error("Named policy '{0}' already exists")]
    PolicyAlreadyExists(String),

    // --- Keyring errors ---
    #[error("Keyring error: {0}")]
    KeyringError(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("User cancelled operation")]
    UserCancelled,

    #[error("Password mismatch — passwords do not match")]
    PasswordMismatch,

    // --- Audit errors ---
    #[error("Audit error: {0}")]
    AuditError(String),
}

impl PsafeError {
    /// Shorthand for field-encoding errors.
    pub fn format(what: &'static str, detail: impl Into<String>) -> Self {
        PsafeError::Format { what, detail: detail.into() }
    }
}

/// Convenience type alias for psafe results.
pub type Result<T> = std::result::Result<T, PsafeError>;
