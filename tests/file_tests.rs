//! End-to-end tests for the file engine: the `FileData` facade over an
//! encrypted container on disk.

use psafe::container::{Container, FieldValue, Record, RecordSet};
use psafe::crypto::Argon2Params;
use psafe::errors::PsafeError;
use psafe::file::{
    FileData, History, Location, PasswdPolicy, RecordFilter, RecordType, UNSUPPORTED_FIELD,
};
use tempfile::TempDir;
use uuid::Uuid;

const PW: &[u8] = b"test-passphrase";

fn file_path() -> (TempDir, std::path::PathBuf) {
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

fn create(path: &std::path::Path) -> FileData {
    FileData::create(path, PW, Some(&fast_params())).expect("create file")
}

fn add_named(fd: &mut FileData, title: &str, passwd: &str) -> Uuid {
    let uuid = fd.add_record().expect("add record");
    fd.set_title(&uuid, Some(title)).unwrap();
    fd.set_password(&uuid, passwd).unwrap();
    uuid
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn create_populate_save_reopen() {
    let (_dir, path) = file_path();
    let mut fd = create(&path);

    let uuid = add_named(&mut fd, "Bank", "hunter2");
    fd.set_group(&uuid, Some("finance")).unwrap();
    fd.set_username(&uuid, Some("alice")).unwrap();
    fd.set_url(&uuid, Some("https://bank.example")).unwrap();
    fd.set_email(&uuid, Some("alice@example.com")).unwrap();
    fd.set_notes(&uuid, Some("line one\nline two")).unwrap();
    fd.save().expect("save");

    let fd2 = FileData::open(&path, PW).expect("reopen");
    assert_eq!(fd2.len(), 1);
    assert_eq!(fd2.title(&uuid).as_deref(), Some("Bank"));
    assert_eq!(fd2.group(&uuid).as_deref(), Some("finance"));
    assert_eq!(fd2.username(&uuid).as_deref(), Some("alice"));
    assert_eq!(fd2.url(&uuid).as_deref(), Some("https://bank.example"));
    assert_eq!(fd2.email(&uuid).as_deref(), Some("alice@example.com"));
    assert_eq!(fd2.notes(&uuid).as_deref(), Some("line one\nline two"));
    assert_eq!(fd2.password(&uuid).as_deref(), Some("hunter2"));
    assert_eq!(fd2.ident(&uuid), "finance/Bank [alice]");
}

#[test]
fn save_stamps_header_metadata() {
    let (_dir, path) = file_path();
    let mut fd = create(&path);
    add_named(&mut fd, "Entry", "pw");
    fd.save().expect("save");

    let fd2 = FileData::open(&path, PW).expect("reopen");
    assert!(fd2.hdr_version().starts_with("3."));
    assert!(!fd2.hdr_uuid().is_empty());
    assert!(fd2.hdr_last_save_time().is_some());
    assert!(fd2.hdr_last_save_app().starts_with("psafe "));
}

#[test]
fn open_with_wrong_passphrase_fails() {
    let (_dir, path) = file_path();
    let mut fd = create(&path);
    fd.save().unwrap();

    assert!(matches!(
        FileData::open(&path, b"wrong"),
        Err(PsafeError::InvalidPassphrase)
    ));
}

#[test]
fn read_only_blocks_writes() {
    let (_dir, path) = file_path();
    let mut fd = create(&path);
    let uuid = add_named(&mut fd, "Entry", "pw");
    fd.set_read_only(true);

    assert!(matches!(
        fd.set_title(&uuid, Some("Renamed")),
        Err(PsafeError::ReadOnly)
    ));
    assert!(matches!(fd.add_record(), Err(PsafeError::ReadOnly)));
}

// ---------------------------------------------------------------------------
// Password changes, history, and expiry
// ---------------------------------------------------------------------------

#[test]
fn password_change_captures_history() {
    let (_dir, path) = file_path();
    let mut fd = create(&path);
    let uuid = add_named(&mut fd, "Entry", "first");

    fd.set_history(&uuid, Some(&History::new(true, 3)), false)
        .unwrap();
    fd.set_password(&uuid, "second").unwrap();
    fd.set_password(&uuid, "third").unwrap();
    fd.save().unwrap();

    let fd2 = FileData::open(&path, PW).expect("reopen");
    let history = fd2.history(&uuid).expect("history present");
    assert!(history.is_enabled());
    let retained: Vec<&str> = history.entries().iter().map(|e| e.passwd.as_str()).collect();
    assert_eq!(retained, vec!["second", "first"]);
    assert_eq!(fd2.password(&uuid).as_deref(), Some("third"));
    assert!(fd2.passwd_mod_time(&uuid).is_some());
}

#[test]
fn unchanged_password_is_not_retained() {
    let (_dir, path) = file_path();
    let mut fd = create(&path);
    let uuid = add_named(&mut fd, "Entry", "same");
    fd.set_history(&uuid, Some(&History::new(true, 3)), false)
        .unwrap();

    fd.set_password(&uuid, "same").unwrap();
    let history = fd.history(&uuid).unwrap();
    assert!(history.entries().is_empty());
}

// ---------------------------------------------------------------------------
// Aliases and shortcuts
// ---------------------------------------------------------------------------

#[test]
fn alias_borrows_target_password() {
    let (_dir, path) = file_path();
    let mut fd = create(&path);
    let base = add_named(&mut fd, "Base", "base-pw");
    let alias = add_named(&mut fd, "Alias", "own-pw");

    fd.set_reference(&alias, &base, RecordType::Alias).unwrap();
    fd.save().unwrap();

    let fd2 = FileData::open(&path, PW).expect("reopen");
    assert_eq!(fd2.record_type(&alias), RecordType::Alias);
    assert_eq!(fd2.password(&alias).as_deref(), Some("base-pw"));
    // The raw payload stays the reference string.
    assert_ne!(fd2.raw_password(&alias).as_deref(), Some("base-pw"));
}

#[test]
fn referenced_record_cannot_be_removed() {
    let (_dir, path) = file_path();
    let mut fd = create(&path);
    let base = add_named(&mut fd, "Base", "pw");
    let alias = add_named(&mut fd, "Alias", "x");
    fd.set_reference(&alias, &base, RecordType::Alias).unwrap();

    assert!(matches!(
        fd.remove_record(&base),
        Err(PsafeError::RecordHasReferences(_, 1))
    ));

    // Removing the alias first releases the base.
    fd.remove_record(&alias).unwrap();
    fd.remove_record(&base).unwrap();
    assert!(fd.is_empty());
}

#[test]
fn reference_chains_flatten_to_base() {
    let (_dir, path) = file_path();
    let mut fd = create(&path);
    let base = add_named(&mut fd, "Base", "pw");
    let first = add_named(&mut fd, "First", "x");
    let second = add_named(&mut fd, "Second", "y");

    fd.set_reference(&first, &base, RecordType::Alias).unwrap();
    fd.set_reference(&second, &first, RecordType::Shortcut)
        .unwrap();

    // The chain collapses: second points straight at base.
    let entry = fd.passwd_record(&second).unwrap();
    assert_eq!(entry.ref_uuid(), Some(&base));
    assert_eq!(fd.password(&second).as_deref(), Some("pw"));
}

#[test]
fn self_reference_is_rejected() {
    let (_dir, path) = file_path();
    let mut fd = create(&path);
    let uuid = add_named(&mut fd, "Entry", "pw");

    assert!(fd.set_reference(&uuid, &uuid, RecordType::Alias).is_err());
}

// ---------------------------------------------------------------------------
// Policies
// ---------------------------------------------------------------------------

#[test]
fn named_policy_roundtrip_and_use_count() {
    let (_dir, path) = file_path();
    let mut fd = create(&path);
    let hdr = PasswdPolicy::new("strong", Location::Header);
    fd.set_hdr_policy_list(&[hdr]).unwrap();

    let uuid = add_named(&mut fd, "Entry", "pw");
    let by_name = PasswdPolicy::new("strong", Location::RecordName);
    fd.set_record_policy(&uuid, Some(&by_name)).unwrap();
    fd.save().unwrap();

    let fd2 = FileData::open(&path, PW).expect("reopen");
    assert!(fd2.hdr_policies().contains("strong"));
    assert_eq!(fd2.hdr_policies().use_count("strong"), Some(1));

    let resolved = fd2.resolved_policy(&uuid).expect("resolved");
    assert_eq!(resolved.name(), "strong");
    assert_eq!(resolved.location(), Location::Header);
}

#[test]
fn policy_rename_retargets_records() {
    let (_dir, path) = file_path();
    let mut fd = create(&path);
    fd.set_hdr_policy_list(&[PasswdPolicy::new("old", Location::Header)])
        .unwrap();
    let uuid = add_named(&mut fd, "Entry", "pw");
    fd.set_record_policy(&uuid, Some(&PasswdPolicy::new("old", Location::RecordName)))
        .unwrap();

    fd.rename_hdr_policy("old", "new").unwrap();
    fd.save().unwrap();

    let fd2 = FileData::open(&path, PW).expect("reopen");
    assert!(!fd2.hdr_policies().contains("old"));
    assert_eq!(fd2.hdr_policies().use_count("new"), Some(1));
    assert_eq!(fd2.record_policy(&uuid).unwrap().name(), "new");
}

#[test]
fn policy_rename_errors() {
    let (_dir, path) = file_path();
    let mut fd = create(&path);
    fd.set_hdr_policy_list(&[
        PasswdPolicy::new("a", Location::Header),
        PasswdPolicy::new("b", Location::Header),
    ])
    .unwrap();

    assert!(matches!(
        fd.rename_hdr_policy("missing", "x"),
        Err(PsafeError::PolicyNotFound(_))
    ));
    assert!(matches!(
        fd.rename_hdr_policy("a", "b"),
        Err(PsafeError::PolicyAlreadyExists(_))
    ));
}

// ---------------------------------------------------------------------------
// Protected records
// ---------------------------------------------------------------------------

#[test]
fn protection_survives_reopen_and_blocks_changes() {
    let (_dir, path) = file_path();
    let mut fd = create(&path);
    let uuid = add_named(&mut fd, "Vault root", "pw");
    fd.set_protected(&uuid, true).unwrap();
    fd.save().unwrap();

    let mut fd2 = FileData::open(&path, PW).expect("reopen");
    assert!(fd2.is_protected(&uuid));
    assert!(matches!(
        fd2.set_title(&uuid, Some("Renamed")),
        Err(PsafeError::RecordProtected(_))
    ));
    assert!(matches!(
        fd2.remove_record(&uuid),
        Err(PsafeError::RecordProtected(_))
    ));

    fd2.set_protected(&uuid, false).unwrap();
    fd2.set_title(&uuid, Some("Renamed")).unwrap();
    fd2.remove_record(&uuid).unwrap();
}

// ---------------------------------------------------------------------------
// Lookup and search
// ---------------------------------------------------------------------------

#[test]
fn find_record_by_title_and_uuid_prefix() {
    let (_dir, path) = file_path();
    let mut fd = create(&path);
    let a = add_named(&mut fd, "Bank", "pw");
    let _b = add_named(&mut fd, "Email", "pw");

    assert_eq!(fd.find_record("bank").unwrap(), a);

    let prefix = &a.simple().to_string()[..8];
    assert_eq!(fd.find_record(prefix).unwrap(), a);

    assert!(matches!(
        fd.find_record("no-such-record"),
        Err(PsafeError::RecordNotFound(_))
    ));
}

#[test]
fn find_record_ambiguity() {
    let (_dir, path) = file_path();
    let mut fd = create(&path);
    add_named(&mut fd, "Bank", "pw");
    add_named(&mut fd, "Bank", "pw");

    // Two records share the exact title.
    assert!(matches!(
        fd.find_record("Bank"),
        Err(PsafeError::AmbiguousRecord(..))
    ));
}

#[test]
fn search_matches_across_fields() {
    let (_dir, path) = file_path();
    let mut fd = create(&path);
    let a = add_named(&mut fd, "Bank", "pw");
    fd.set_username(&a, Some("alice")).unwrap();
    let b = add_named(&mut fd, "Webmail", "pw");
    fd.set_notes(&b, Some("the ALICE account")).unwrap();

    let filter = RecordFilter::new("alice", false).unwrap();
    let mut hits = fd.search(&filter);
    hits.sort();
    assert_eq!(hits.len(), 2);

    let filter_cs = RecordFilter::new("ALICE", true).unwrap();
    let hits_cs = fd.search(&filter_cs);
    assert_eq!(hits_cs.len(), 1);
    assert_eq!(hits_cs[0].0, b);
}

// ---------------------------------------------------------------------------
// Unknown schema degradation
// ---------------------------------------------------------------------------

#[test]
fn unknown_schema_loads_and_degrades() {
    let (_dir, path) = file_path();

    // Write a container claiming a future schema version.
    let container = Container::create(&path, PW, Some(&fast_params())).expect("create");
    let mut record_set = RecordSet::new(9);
    let mut rec = Record::new();
    let uuid = Uuid::new_v4();
    rec.set(0x01, FieldValue::Uuid(uuid.to_string()));
    rec.set(0x03, FieldValue::Str("Future title".into()));
    record_set.records.push(rec);
    container.save(&record_set).expect("save");

    let mut fd = FileData::open(&path, PW).expect("unknown schema must load");

    // Records are addressable, fields read as the sentinel, and no
    // write invents fields in a file we don't understand.
    assert!(fd.contains(&uuid));
    assert_eq!(fd.title(&uuid).as_deref(), Some(UNSUPPORTED_FIELD));
    assert_eq!(fd.hdr_version(), UNSUPPORTED_FIELD);
    fd.set_title(&uuid, Some("ignored")).unwrap();
    assert_eq!(fd.title(&uuid).as_deref(), Some(UNSUPPORTED_FIELD));
}
