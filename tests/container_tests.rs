//! Integration tests for the psafe container: the encrypted envelope
//! and the record-set payload it carries.

use std::fs;

use psafe::container::{Container, FieldValue, Record, RecordSet};
use psafe::crypto::Argon2Params;
use psafe::errors::PsafeError;
use tempfile::TempDir;

/// Helper: a temporary container file path inside a fresh temp dir.
fn container_path() -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("test.psdb");
    (dir, path)
}

/// Fast Argon2 parameters so tests don't burn CPU on key stretching.
fn fast_params() -> Argon2Params {
    Argon2Params {
        memory_kib: 8_192,
        iterations: 1,
        parallelism: 1,
    }
}

// ---------------------------------------------------------------------------
// Create and re-open round-trip
// ---------------------------------------------------------------------------

#[test]
fn create_save_and_reopen() {
    let (_dir, path) = container_path();
    let passphrase = b"test-passphrase";

    let container = Container::create(&path, passphrase, Some(&fast_params())).expect("create");

    let mut record_set = RecordSet::new(3);
    let mut rec = Record::new();
    rec.set(0x03, FieldValue::Str("Bank".into()));
    rec.set(0x04, FieldValue::Str("alice".into()));
    record_set.records.push(rec);
    container.save(&record_set).expect("save");

    let (_container2, loaded) = Container::open(&path, passphrase).expect("open");
    assert_eq!(loaded.schema, 3);
    assert_eq!(loaded.records.len(), 1);
    assert_eq!(loaded.records[0].str_field(0x03), Some("Bank"));
    assert_eq!(loaded.records[0].str_field(0x04), Some("alice"));
}

#[test]
fn open_with_wrong_passphrase_fails() {
    let (_dir, path) = container_path();
    let container = Container::create(&path, b"right", Some(&fast_params())).expect("create");
    container.save(&RecordSet::new(3)).expect("save");

    let result = Container::open(&path, b"wrong");
    assert!(
        matches!(result, Err(PsafeError::InvalidPassphrase)),
        "wrong passphrase must read as InvalidPassphrase"
    );
}

#[test]
fn open_missing_file_fails() {
    let result = Container::open(std::path::Path::new("/nonexistent/nope.psdb"), b"pw");
    assert!(matches!(result, Err(PsafeError::FileNotFound(_))));
}

#[test]
fn create_refuses_to_overwrite() {
    let (_dir, path) = container_path();
    let container = Container::create(&path, b"pw", Some(&fast_params())).expect("create");
    container.save(&RecordSet::new(3)).expect("save");

    let result = Container::create(&path, b"pw", Some(&fast_params()));
    assert!(matches!(result, Err(PsafeError::FileAlreadyExists(_))));
}

// ---------------------------------------------------------------------------
// Integrity
// ---------------------------------------------------------------------------

#[test]
fn tampered_payload_reads_as_invalid_passphrase() {
    let (_dir, path) = container_path();
    let container = Container::create(&path, b"pw", Some(&fast_params())).expect("create");
    container.save(&RecordSet::new(3)).expect("save");

    // Flip one bit inside the trailing HMAC tag.
    let mut bytes = fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;
    fs::write(&path, &bytes).unwrap();

    // An integrity failure is indistinguishable from a bad passphrase.
    let result = Container::open(&path, b"pw");
    assert!(matches!(result, Err(PsafeError::InvalidPassphrase)));
}

#[test]
fn truncated_file_is_invalid() {
    let (_dir, path) = container_path();
    let container = Container::create(&path, b"pw", Some(&fast_params())).expect("create");
    container.save(&RecordSet::new(3)).expect("save");

    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..20]).unwrap();

    assert!(Container::open(&path, b"pw").is_err());
}

#[test]
fn bad_magic_is_invalid_container() {
    let (_dir, path) = container_path();
    fs::write(&path, b"NOPE-this-is-not-a-container-file-but-is-long-enough").unwrap();

    let result = Container::open(&path, b"pw");
    assert!(matches!(result, Err(PsafeError::InvalidContainer(_))));
}

#[test]
fn save_leaves_no_temp_file() {
    let (dir, path) = container_path();
    let container = Container::create(&path, b"pw", Some(&fast_params())).expect("create");
    container.save(&RecordSet::new(3)).expect("save");

    let names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["test.psdb".to_string()]);
}

// ---------------------------------------------------------------------------
// Passphrase change
// ---------------------------------------------------------------------------

#[test]
fn change_passphrase_reencrypts() {
    let (_dir, path) = container_path();
    let mut container = Container::create(&path, b"old-pw", Some(&fast_params())).expect("create");

    let mut record_set = RecordSet::new(3);
    let mut rec = Record::new();
    rec.set(0x06, FieldValue::Str("hunter2".into()));
    record_set.records.push(rec);
    container.save(&record_set).expect("save");

    container.change_passphrase(b"new-pw").expect("change");
    container.save(&record_set).expect("save with new key");

    assert!(matches!(
        Container::open(&path, b"old-pw"),
        Err(PsafeError::InvalidPassphrase)
    ));
    let (_c, loaded) = Container::open(&path, b"new-pw").expect("open with new passphrase");
    assert_eq!(loaded.records[0].str_field(0x06), Some("hunter2"));
}

// ---------------------------------------------------------------------------
// Custom KDF parameters
// ---------------------------------------------------------------------------

#[test]
fn custom_argon2_params_roundtrip() {
    let (_dir, path) = container_path();
    let params = Argon2Params {
        memory_kib: 16_384,
        iterations: 2,
        parallelism: 1,
    };

    let container = Container::create(&path, b"pw", Some(&params)).expect("create");
    container.save(&RecordSet::new(3)).expect("save");

    // Open must succeed without being told the params — they are stored
    // in the plaintext header.
    let (_c, loaded) = Container::open(&path, b"pw").expect("open");
    assert_eq!(loaded.schema, 3);
}

// ---------------------------------------------------------------------------
// Field values and modified tracking
// ---------------------------------------------------------------------------

#[test]
fn record_set_tracks_modifications() {
    let mut record_set = RecordSet::new(3);
    let mut rec = Record::new();
    rec.set(0x03, FieldValue::Str("Title".into()));
    record_set.records.push(rec);
    assert!(record_set.any_modified());

    record_set.clear_modified();
    assert!(!record_set.any_modified());

    // Setting the same value again is not a modification.
    record_set.records[0].set(0x03, FieldValue::Str("Title".into()));
    assert!(!record_set.any_modified());

    record_set.records[0].set(0x03, FieldValue::Str("Renamed".into()));
    assert!(record_set.any_modified());
}

#[test]
fn field_values_survive_serialization() {
    let (_dir, path) = container_path();
    let container = Container::create(&path, b"pw", Some(&fast_params())).expect("create");

    let mut record_set = RecordSet::new(3);
    let mut rec = Record::new();
    rec.set(0x03, FieldValue::Str("Title".into()));
    rec.set(0x11, FieldValue::Int(42));
    rec.set(0x15, FieldValue::Byte(1));
    rec.set(
        0x07,
        FieldValue::Time(chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap()),
    );
    record_set.records.push(rec);
    container.save(&record_set).expect("save");

    let (_c, loaded) = Container::open(&path, b"pw").expect("open");
    let rec = &loaded.records[0];
    assert_eq!(rec.str_field(0x03), Some("Title"));
    assert_eq!(rec.int_field(0x11), Some(42));
    assert_eq!(rec.int_field(0x15), Some(1));
    assert_eq!(
        rec.time_field(0x07).map(|t| t.timestamp()),
        Some(1_700_000_000)
    );
}
