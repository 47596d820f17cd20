//! Binary container format and HMAC integrity verification.
//!
//! A `.psafe` file has this layout:
//!
//! ```text
//! [PSDB: 4 bytes][version: 1 byte][salt: 32 bytes][payload_off: 4 bytes LE][header JSON][encrypted payload][HMAC-SHA256: 32 bytes]
//! ```
//!
//! - **Magic** (`PSDB`): identifies the file as a psafe container.
//! - **Version**: container format version (currently `1`).
//! - **Salt**: the Argon2id salt, stored in the clear so the master key
//!   can be derived before anything else is parsed.
//! - **Header length**: little-endian u32 telling us where the header
//!   JSON ends and the encrypted payload begins.
//! - **Header JSON**: serialized `ContainerHeader` (plaintext metadata).
//! - **Encrypted payload**: AES-256-GCM nonce + ciphertext of the
//!   record-set JSON.
//! - **HMAC-SHA256**: 32-byte tag computed over header + payload bytes.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::crypto::kdf::SALT_LEN;
use crate::errors::{PsafeError, Result};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic bytes at the start of every container file.
const MAGIC: &[u8; 4] = b"PSDB";

/// Current container format version.
pub const CURRENT_VERSION: u8 = 1;

/// Size of the HMAC tag appended to the file (SHA-256 = 32 bytes).
const HMAC_LEN: usize = 32;

/// Fixed-size prefix: 4 (magic) + 1 (version) + 32 (salt) + 4 (header_len).
const PREFIX_LEN: usize = 4 + 1 + SALT_LEN + 4;

// ---------------------------------------------------------------------------
// ContainerHeader
// ---------------------------------------------------------------------------

/// Argon2 parameters stored in the container header so the exact same
/// KDF settings are used when re-opening.  Backward-compatible:
/// if missing, defaults are used (m=64MB, t=3, p=4).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StoredArgon2Params {
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl Default for StoredArgon2Params {
    fn default() -> Self {
        Self {
            memory_kib: 65_536,
            iterations: 3,
            parallelism: 4,
        }
    }
}

/// Plaintext metadata stored at the beginning of a container file.
///
/// Everything sensitive lives in the encrypted payload; this header only
/// carries what is needed to derive keys and identify the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerHeader {
    /// Container format version.
    pub version: u8,

    /// When this file was first created.
    pub created_at: DateTime<Utc>,

    /// Argon2 params used at creation (stored so open uses the same).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub argon2_params: Option<StoredArgon2Params>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Write a container file to disk **atomically**.
///
/// 1. Serialize the header to JSON.
/// 2. Compute HMAC over header + payload bytes.
/// 3. Write to a temp file in the same directory.
/// 4. Rename temp file over the target path.
///
/// The rename ensures readers never see a half-written file.
pub fn write_container(
    path: &Path,
    header: &ContainerHeader,
    salt: &[u8; SALT_LEN],
    payload: &[u8],
    hmac_key: &[u8],
) -> Result<()> {
    let header_bytes = serde_json::to_vec(header)
        .map_err(|e| PsafeError::SerializationError(format!("header: {e}")))?;

    let hmac_tag = compute_hmac(hmac_key, &header_bytes, payload)?;

    // Build the binary blob.
    let header_len = u32::try_from(header_bytes.len()).map_err(|_| {
        PsafeError::SerializationError(format!(
            "header length {} exceeds u32::MAX",
            header_bytes.len()
        ))
    })?;
    let total = PREFIX_LEN + header_bytes.len() + payload.len() + HMAC_LEN;
    let mut buf = Vec::with_capacity(total);

    buf.extend_from_slice(MAGIC); // 4 bytes
    buf.push(CURRENT_VERSION); // 1 byte
    buf.extend_from_slice(salt); // 32 bytes
    buf.extend_from_slice(&header_len.to_le_bytes()); // 4 bytes LE
    buf.extend_from_slice(&header_bytes); // header JSON
    buf.extend_from_slice(payload); // encrypted payload
    buf.extend_from_slice(&hmac_tag); // 32 bytes

    // Atomic write: write to a temp file, then rename.
    // The temp file is in the same directory so rename is guaranteed
    // to be atomic on the same filesystem.
    let parent = path.parent().unwrap_or(Path::new("."));
    let tmp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));

    fs::write(&tmp_path, &buf)?;
    fs::rename(&tmp_path, path)?;

    Ok(())
}

/// Raw data read from a container file on disk.
///
/// Keeps the original bytes so the HMAC can be verified over the
/// exact bytes that were written — no re-serialization needed.
pub struct RawContainer {
    pub header: ContainerHeader,
    pub salt: [u8; SALT_LEN],
    /// The raw header JSON bytes exactly as stored on disk.
    pub header_bytes: Vec<u8>,
    /// The encrypted payload bytes (nonce + ciphertext).
    pub payload: Vec<u8>,
    /// The HMAC tag stored at the end of the file.
    pub stored_hmac: Vec<u8>,
}

/// Read a container file from disk and return its parts **with raw bytes**.
///
/// The caller should verify the HMAC over `header_bytes` and `payload`
/// (the original bytes from disk) before trusting anything decrypted
/// out of the payload.
pub fn read_container(path: &Path) -> Result<RawContainer> {
    if !path.exists() {
        return Err(PsafeError::FileNotFound(path.to_path_buf()));
    }

    let data = fs::read(path)?;

    // Minimum size: prefix + HMAC.
    let min_size = PREFIX_LEN + HMAC_LEN;
    if data.len() < min_size {
        return Err(PsafeError::InvalidContainer(
            "file too small to be a valid password file".into(),
        ));
    }

    // --- Parse the fixed-size prefix ---

    if &data[0..4] != MAGIC {
        return Err(PsafeError::InvalidContainer(
            "missing PSDB magic bytes".into(),
        ));
    }

    let version = data[4];
    if version != CURRENT_VERSION {
        return Err(PsafeError::UnsupportedContainer(version));
    }

    let mut salt = [0u8; SALT_LEN];
    salt.copy_from_slice(&data[5..5 + SALT_LEN]);

    let len_at = 5 + SALT_LEN;
    let header_len_u32 = u32::from_le_bytes(
        data[len_at..len_at + 4]
            .try_into()
            .map_err(|_| PsafeError::InvalidContainer("bad header length".into()))?,
    );
    let header_len = usize::try_from(header_len_u32).map_err(|_| {
        PsafeError::InvalidContainer(format!(
            "header length {header_len_u32} exceeds platform address space"
        ))
    })?;

    let header_end = PREFIX_LEN + header_len;
    if header_end + HMAC_LEN > data.len() {
        return Err(PsafeError::InvalidContainer(
            "header length exceeds file size".into(),
        ));
    }

    // --- Extract the variable-length sections as raw bytes ---

    let header_bytes = data[PREFIX_LEN..header_end].to_vec();
    let payload_end = data.len() - HMAC_LEN;
    let payload = data[header_end..payload_end].to_vec();
    let stored_hmac = data[payload_end..].to_vec();

    // --- Deserialize the header from the raw bytes ---

    let header: ContainerHeader = serde_json::from_slice(&header_bytes)
        .map_err(|e| PsafeError::InvalidContainer(format!("header JSON: {e}")))?;

    Ok(RawContainer {
        header,
        salt,
        header_bytes,
        payload,
        stored_hmac,
    })
}

/// Compute HMAC-SHA256 over header + payload bytes.
pub fn compute_hmac(hmac_key: &[u8], header_bytes: &[u8], payload: &[u8]) -> Result<Vec<u8>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(hmac_key)
        .map_err(|e| PsafeError::InvalidContainer(format!("invalid HMAC key: {e}")))?;

    mac.update(header_bytes);
    mac.update(payload);

    Ok(mac.finalize().into_bytes().to_vec())
}

/// Verify that the HMAC matches using constant-time comparison.
///
/// A failed tag means either a wrong passphrase or a tampered file; the
/// two are indistinguishable with a keyed MAC, so both surface as
/// `InvalidPassphrase`.
pub fn verify_hmac(
    hmac_key: &[u8],
    header_bytes: &[u8],
    payload: &[u8],
    expected_hmac: &[u8],
) -> Result<()> {
    let mut mac = Hmac::<Sha256>::new_from_slice(hmac_key)
        .map_err(|e| PsafeError::InvalidContainer(format!("invalid HMAC key: {e}")))?;

    mac.update(header_bytes);
    mac.update(payload);

    mac.verify_slice(expected_hmac)
        .map_err(|_| PsafeError::InvalidPassphrase)
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

pub(crate) fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let encoded = BASE64.encode(data);
    serializer.serialize_str(&encoded)
}

pub(crate) fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}
