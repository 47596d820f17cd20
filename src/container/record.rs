//! Record and RecordSet types stored inside a password file container.
//!
//! A record is a map from a physical field id (one byte) to a typed
//! value.  The container does not interpret field ids — what id 6 means
//! in a given schema version is the field mapper's business, not ours.
//! The `Bytes` variant uses custom serde helpers so it serializes as a
//! base64 string in JSON rather than a raw byte array.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// Re-use the base64 serde helpers from envelope.rs (no duplication).
use super::envelope::{base64_decode, base64_encode};

/// A typed field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v")]
pub enum FieldValue {
    /// UTF-8 text (titles, notes, encoded policies, ...).
    Str(String),
    /// Unsigned 32-bit integer (intervals, counters).
    Int(u32),
    /// Single byte (schema version markers, small flags).
    Byte(u8),
    /// Timestamp.
    Time(DateTime<Utc>),
    /// Canonical hyphenated lowercase UUID text.
    Uuid(String),
    /// Raw bytes, base64 in JSON.
    Bytes(
        #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")] Vec<u8>,
    ),
}

impl FieldValue {
    /// Returns the string payload for `Str` and `Uuid` values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) | FieldValue::Uuid(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<u32> {
        match self {
            FieldValue::Int(n) => Some(*n),
            FieldValue::Byte(b) => Some(u32::from(*b)),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<DateTime<Utc>> {
        match self {
            FieldValue::Time(t) => Some(*t),
            _ => None,
        }
    }
}

/// One record: physical field id -> value, plus an in-memory dirty flag.
///
/// The dirty flag never touches disk; it tracks unsaved changes so that
/// a save can tell callers what it committed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Record {
    /// Field id -> value.  BTreeMap keeps serialized output deterministic.
    pub fields: BTreeMap<u8, FieldValue>,

    #[serde(skip)]
    modified: bool,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: u8) -> Option<&FieldValue> {
        self.fields.get(&id)
    }

    /// Set a field, marking the record modified only if the value changed.
    pub fn set(&mut self, id: u8, value: FieldValue) {
        if self.fields.get(&id) != Some(&value) {
            self.fields.insert(id, value);
            self.modified = true;
        }
    }

    /// Remove a field, marking the record modified if it was present.
    pub fn remove(&mut self, id: u8) -> Option<FieldValue> {
        let old = self.fields.remove(&id);
        if old.is_some() {
            self.modified = true;
        }
        old
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn clear_modified(&mut self) {
        self.modified = false;
    }

    // Typed accessors used all over the facade.

    pub fn str_field(&self, id: u8) -> Option<&str> {
        self.get(id).and_then(FieldValue::as_str)
    }

    pub fn int_field(&self, id: u8) -> Option<u32> {
        self.get(id).and_then(FieldValue::as_int)
    }

    pub fn time_field(&self, id: u8) -> Option<DateTime<Utc>> {
        self.get(id).and_then(FieldValue::as_time)
    }
}

/// Everything a container stores: the schema version byte, one header
/// record, and the item records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSet {
    /// Raw schema version byte (1, 2, 3, or something newer).
    pub schema: u8,

    /// The file-level header record.
    pub header: Record,

    /// The item records.
    pub records: Vec<Record>,
}

impl RecordSet {
    pub fn new(schema: u8) -> Self {
        Self {
            schema,
            header: Record::new(),
            records: Vec::new(),
        }
    }

    /// True if the header or any record carries unsaved changes.
    pub fn any_modified(&self) -> bool {
        self.header.is_modified() || self.records.iter().any(Record::is_modified)
    }

    /// Clear every dirty flag.  Called after a successful save.
    pub fn clear_modified(&mut self) {
        self.header.clear_modified();
        for rec in &mut self.records {
            rec.clear_modified();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_same_value_does_not_dirty() {
        let mut rec = Record::new();
        rec.set(3, FieldValue::Str("Email".into()));
        assert!(rec.is_modified());

        rec.clear_modified();
        rec.set(3, FieldValue::Str("Email".into()));
        assert!(!rec.is_modified());

        rec.set(3, FieldValue::Str("Mail".into()));
        assert!(rec.is_modified());
    }

    #[test]
    fn remove_missing_field_does_not_dirty() {
        let mut rec = Record::new();
        assert!(rec.remove(9).is_none());
        assert!(!rec.is_modified());
    }

    #[test]
    fn record_set_round_trips_through_json() {
        let mut set = RecordSet::new(3);
        set.header.set(0, FieldValue::Int(0x030D));
        let mut rec = Record::new();
        rec.set(1, FieldValue::Uuid("6ba7b810-9dad-11d1-80b4-00c04fd430c8".into()));
        rec.set(3, FieldValue::Str("Bank".into()));
        rec.set(7, FieldValue::Time(Utc::now()));
        rec.set(21, FieldValue::Byte(1));
        set.records.push(rec);

        let bytes = serde_json::to_vec(&set).unwrap();
        let back: RecordSet = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(back.schema, 3);
        assert_eq!(back.records.len(), 1);
        assert_eq!(back.records[0].str_field(3), Some("Bank"));
        // Dirty flags are in-memory only.
        assert!(!back.records[0].is_modified());
    }
}
