//! The encrypted container that holds a record set.
//!
//! This module splits the storage problem in two:
//! - `envelope` deals in bytes: magic, salt, header JSON, payload, HMAC.
//! - `Container` deals in keys: derive from a passphrase, verify, then
//!   encrypt or decrypt the record-set payload.
//!
//! What the records *mean* is none of the container's business; the
//! `file` module owns that.

pub mod envelope;
pub mod record;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use zeroize::Zeroize;

use crate::crypto::encryption::{decrypt, encrypt};
use crate::crypto::kdf::{derive_master_key_with_params, generate_salt, Argon2Params, SALT_LEN};
use crate::crypto::keys::MasterKey;
use crate::errors::{PsafeError, Result};

pub use envelope::{ContainerHeader, StoredArgon2Params, CURRENT_VERSION};
pub use record::{FieldValue, Record, RecordSet};

/// An open container: path, plaintext header, and the derived master key.
///
/// Create one with `Container::create` or `Container::open`, then use
/// `save` to persist a record set.  The master key is zeroized on drop.
pub struct Container {
    /// Path to the `.psdb` file on disk.
    path: PathBuf,

    /// Plaintext header (format version, creation time, KDF params).
    header: ContainerHeader,

    /// The Argon2id salt, kept so saves reuse it.
    salt: [u8; SALT_LEN],

    /// The derived master key (zeroized on drop).
    master_key: MasterKey,
}

impl Container {
    /// Prepare a brand-new container at `path`.
    ///
    /// Generates a random salt and derives the master key from the
    /// passphrase.  Nothing is written to disk until the first `save`.
    ///
    /// Pass `None` for `argon2_params` to use sensible defaults,
    /// `Some(settings.argon2_params())` to use config values.
    pub fn create(
        path: &Path,
        passphrase: &[u8],
        argon2_params: Option<&Argon2Params>,
    ) -> Result<Self> {
        if path.exists() {
            return Err(PsafeError::FileAlreadyExists(path.to_path_buf()));
        }

        let salt = generate_salt();
        let effective_params = argon2_params.copied().unwrap_or_default();

        let mut master_bytes = derive_master_key_with_params(passphrase, &salt, &effective_params)?;
        let master_key = MasterKey::new(master_bytes);
        master_bytes.zeroize();

        let header = ContainerHeader {
            version: CURRENT_VERSION,
            created_at: Utc::now(),
            argon2_params: Some(StoredArgon2Params {
                memory_kib: effective_params.memory_kib,
                iterations: effective_params.iterations,
                parallelism: effective_params.parallelism,
            }),
        };

        Ok(Self {
            path: path.to_path_buf(),
            header,
            salt,
            master_key,
        })
    }

    /// Open an existing container, verify its integrity, and decrypt the
    /// record set.
    ///
    /// Reads the binary file, derives the master key from the
    /// passphrase + stored salt (using stored Argon2 params), verifies
    /// the HMAC **over the original bytes from disk**, and only then
    /// decrypts and parses the payload.
    pub fn open(path: &Path, passphrase: &[u8]) -> Result<(Self, RecordSet)> {
        let raw = envelope::read_container(path)?;

        // Derive the master key using the stored Argon2 params, falling
        // back to defaults for containers without stored params.
        let stored = raw.header.argon2_params.unwrap_or_default();
        let params = Argon2Params {
            memory_kib: stored.memory_kib,
            iterations: stored.iterations,
            parallelism: stored.parallelism,
        };
        let mut master_bytes = derive_master_key_with_params(passphrase, &raw.salt, &params)?;
        let master_key = MasterKey::new(master_bytes);
        master_bytes.zeroize();

        // Verify the HMAC over the *original raw bytes* from disk before
        // touching the ciphertext.
        let mut hmac_key = master_key.derive_hmac_key()?;
        let verified =
            envelope::verify_hmac(&hmac_key, &raw.header_bytes, &raw.payload, &raw.stored_hmac);
        hmac_key.zeroize();
        verified?;

        // Decrypt and parse the record set.
        let mut enc_key = master_key.derive_enc_key()?;
        let plaintext = decrypt(&enc_key, &raw.payload);
        enc_key.zeroize();
        let mut plaintext = plaintext?;

        let parsed: std::result::Result<RecordSet, _> = serde_json::from_slice(&plaintext);
        plaintext.zeroize();
        let record_set =
            parsed.map_err(|e| PsafeError::InvalidContainer(format!("record set JSON: {e}")))?;

        Ok((
            Self {
                path: path.to_path_buf(),
                header: raw.header,
                salt: raw.salt,
                master_key,
            },
            record_set,
        ))
    }

    /// Encrypt the record set and write the container to disk atomically.
    pub fn save(&self, record_set: &RecordSet) -> Result<()> {
        let mut plaintext = serde_json::to_vec(record_set)
            .map_err(|e| PsafeError::SerializationError(format!("record set: {e}")))?;

        let mut enc_key = self.master_key.derive_enc_key()?;
        let payload = encrypt(&enc_key, &plaintext);
        enc_key.zeroize();
        plaintext.zeroize();
        let payload = payload?;

        let mut hmac_key = self.master_key.derive_hmac_key()?;
        let written =
            envelope::write_container(&self.path, &self.header, &self.salt, &payload, &hmac_key);
        hmac_key.zeroize();
        written
    }

    /// Re-key the container with a new passphrase and a fresh salt.
    ///
    /// Takes effect on disk at the next `save`.
    pub fn change_passphrase(&mut self, new_passphrase: &[u8]) -> Result<()> {
        let salt = generate_salt();
        let stored = self.header.argon2_params.unwrap_or_default();
        let params = Argon2Params {
            memory_kib: stored.memory_kib,
            iterations: stored.iterations,
            parallelism: stored.parallelism,
        };

        let mut master_bytes = derive_master_key_with_params(new_passphrase, &salt, &params)?;
        self.master_key = MasterKey::new(master_bytes);
        master_bytes.zeroize();
        self.salt = salt;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.header.created_at
    }
}
