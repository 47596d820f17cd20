//! Alias and shortcut resolution plus the derived per-record index
//! entry.
//!
//! A record whose password field is `[[` + 32 hex digits + `]]` is an
//! alias for the record with that UUID; `[~ … ~]` marks a shortcut.
//! Either way the target must exist in the file, and it tracks every
//! record pointing at it so deletion can be refused while references
//! remain.

use std::collections::BTreeSet;

use uuid::Uuid;

use crate::file::expiry::PasswdExpiration;
use crate::file::policy::PasswdPolicy;

/// How a record's password field behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    /// The password field holds the password itself.
    Normal,
    /// The password borrows another record's password; the alias exposes
    /// the target's other details too.
    Alias,
    /// Like an alias, but the record keeps its own details.
    Shortcut,
}

impl std::fmt::Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordType::Normal => write!(f, "normal"),
            RecordType::Alias => write!(f, "alias"),
            RecordType::Shortcut => write!(f, "shortcut"),
        }
    }
}

/// Parse an alias/shortcut password payload.  The body must be exactly
/// the 32 hex digits of the target UUID without punctuation; anything
/// else is an ordinary password.
pub fn parse_ref(passwd: &str) -> Option<(RecordType, Uuid)> {
    let (rec_type, body) = if let Some(body) =
        passwd.strip_prefix("[[").and_then(|s| s.strip_suffix("]]"))
    {
        (RecordType::Alias, body)
    } else if let Some(body) = passwd.strip_prefix("[~").and_then(|s| s.strip_suffix("~]")) {
        (RecordType::Shortcut, body)
    } else {
        return None;
    };
    if body.len() != 32 {
        return None;
    }
    Uuid::try_parse(body).ok().map(|uuid| (rec_type, uuid))
}

/// Build the password payload referencing `uuid`; `None` for normal
/// records.
pub fn reference_string(rec_type: RecordType, uuid: &Uuid) -> Option<String> {
    match rec_type {
        RecordType::Normal => None,
        RecordType::Alias => Some(format!("[[{}]]", uuid.as_simple())),
        RecordType::Shortcut => Some(format!("[~{}~]", uuid.as_simple())),
    }
}

/// Resolve a raw password field to a record type and target.  Only V3
/// files support references, and the target has to exist; an
/// unresolvable payload is just a strange password.
pub fn resolve_reference<F>(passwd: Option<&str>, is_v3: bool, mut exists: F) -> (RecordType, Option<Uuid>)
where
    F: FnMut(&Uuid) -> bool,
{
    if is_v3 {
        if let Some((rec_type, uuid)) = passwd.and_then(parse_ref) {
            if exists(&uuid) {
                return (rec_type, Some(uuid));
            }
        }
    }
    (RecordType::Normal, None)
}

/// Derived index entry for one record: its reference state, the records
/// referencing it, and decoded policy/expiration caches.  Rebuilt by
/// the facade on reindex and patched on password/policy/expiry changes.
#[derive(Debug, Clone)]
pub struct PasswdRecord {
    uuid: Uuid,
    rec_type: RecordType,
    ref_uuid: Option<Uuid>,
    refs_to_record: BTreeSet<Uuid>,
    passwd_policy: Option<PasswdPolicy>,
    passwd_expiry: Option<PasswdExpiration>,
}

impl PasswdRecord {
    pub fn new(uuid: Uuid) -> Self {
        Self {
            uuid,
            rec_type: RecordType::Normal,
            ref_uuid: None,
            refs_to_record: BTreeSet::new(),
            passwd_policy: None,
            passwd_expiry: None,
        }
    }

    pub fn uuid(&self) -> &Uuid {
        &self.uuid
    }

    pub fn rec_type(&self) -> RecordType {
        self.rec_type
    }

    /// Target record when this one is an alias or shortcut.
    pub fn ref_uuid(&self) -> Option<&Uuid> {
        self.ref_uuid.as_ref()
    }

    /// Records whose password references this one.
    pub fn refs_to_record(&self) -> &BTreeSet<Uuid> {
        &self.refs_to_record
    }

    pub fn has_refs(&self) -> bool {
        !self.refs_to_record.is_empty()
    }

    pub fn policy(&self) -> Option<&PasswdPolicy> {
        self.passwd_policy.as_ref()
    }

    pub fn expiry(&self) -> Option<&PasswdExpiration> {
        self.passwd_expiry.as_ref()
    }

    pub(crate) fn set_reference(&mut self, rec_type: RecordType, ref_uuid: Option<Uuid>) {
        self.rec_type = rec_type;
        self.ref_uuid = ref_uuid;
    }

    pub(crate) fn set_cached_policy(&mut self, policy: Option<PasswdPolicy>) {
        self.passwd_policy = policy;
    }

    pub(crate) fn set_cached_expiry(&mut self, expiry: Option<PasswdExpiration>) {
        self.passwd_expiry = expiry;
    }

    pub(crate) fn add_back_ref(&mut self, uuid: Uuid) {
        self.refs_to_record.insert(uuid);
    }

    pub(crate) fn remove_back_ref(&mut self, uuid: &Uuid) {
        self.refs_to_record.remove(uuid);
    }
}
