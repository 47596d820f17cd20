use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{PsafeError, Result};

/// Project-level configuration, loaded from `.psafe.toml`.
///
/// Every field has a sensible default so psafe works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Password file to open when `--file` is not given.
    #[serde(default = "default_file")]
    pub default_file: String,

    /// Symbol set used for generated passwords when neither the policy
    /// nor the record carries its own.  Empty/absent means the built-in
    /// set.
    #[serde(default)]
    pub default_symbols: Option<String>,

    /// Password-history capacity enabled on newly added records.
    /// Zero disables history for new records.
    #[serde(default = "default_history_size")]
    pub new_record_history_size: usize,

    /// Argon2 memory cost in KiB (default: 64 MB).
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    /// Argon2 iteration count (default: 3).
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2 parallelism degree (default: 4).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_file() -> String {
    "passwords.psdb".to_string()
}

fn default_history_size() -> usize {
    5
}

fn default_argon2_memory_kib() -> u32 {
    65_536 // 64 MB
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_file: default_file(),
            default_symbols: None,
            new_record_history_size: default_history_size(),
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the working directory.
    const FILE_NAME: &'static str = ".psafe.toml";

    /// Load settings from `<dir>/.psafe.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            PsafeError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    /// The password file path for a run: the `--file` override if given,
    /// otherwise `<dir>/<default_file>`.
    pub fn file_path(&self, dir: &Path, file_arg: Option<&str>) -> PathBuf {
        match file_arg {
            Some(file) => PathBuf::from(file),
            None => dir.join(&self.default_file),
        }
    }

    /// Convert the Argon2 settings into crypto-layer params.
    pub fn argon2_params(&self) -> crate::crypto::kdf::Argon2Params {
        crate::crypto::kdf::Argon2Params {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert_eq!(s.default_file, "passwords.psdb");
        assert_eq!(s.default_symbols, None);
        assert_eq!(s.new_record_history_size, 5);
        assert_eq!(s.argon2_memory_kib, 65_536);
        assert_eq!(s.argon2_iterations, 3);
        assert_eq!(s.argon2_parallelism, 4);
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.default_file, "passwords.psdb");
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
default_file = "work.psdb"
default_symbols = "@#$%"
new_record_history_size = 10
argon2_memory_kib = 131072
argon2_iterations = 5
argon2_parallelism = 8
"#;
        fs::write(tmp.path().join(".psafe.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.default_file, "work.psdb");
        assert_eq!(settings.default_symbols.as_deref(), Some("@#$%"));
        assert_eq!(settings.new_record_history_size, 10);
        assert_eq!(settings.argon2_memory_kib, 131_072);
        assert_eq!(settings.argon2_iterations, 5);
        assert_eq!(settings.argon2_parallelism, 8);
    }

    #[test]
    fn load_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        let config = "default_file = \"home.psdb\"\n";
        fs::write(tmp.path().join(".psafe.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.default_file, "home.psdb");
        // Rest should be defaults
        assert_eq!(settings.new_record_history_size, 5);
        assert_eq!(settings.argon2_iterations, 3);
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".psafe.toml"), "not valid {{toml").unwrap();

        let result = Settings::load(tmp.path());
        assert!(result.is_err());
    }

    #[test]
    fn file_path_prefers_explicit_argument() {
        let s = Settings::default();
        let dir = Path::new("/home/user");
        assert_eq!(
            s.file_path(dir, Some("/tmp/other.psdb")),
            PathBuf::from("/tmp/other.psdb")
        );
        assert_eq!(
            s.file_path(dir, None),
            PathBuf::from("/home/user/passwords.psdb")
        );
    }
}
