//! Abstract-to-physical field mapping across schema versions.
//!
//! Records in a password file are keyed by one-byte physical field ids,
//! and the three schema generations disagree about them.  The rest of
//! the crate speaks in abstract `RecordField` / `HeaderField` terms and
//! lets `map_record_field` / `map_header_field` translate for whatever
//! version the open file carries.
//!
//! The mapping is a pure function of (field, version).  For the newest
//! schema it is the identity; older schemas redirect a subset of fields
//! to their legacy ids and drop the rest as `NotPresent`.  Unknown
//! schema versions map everything to `Unsupported`.

use serde::{Deserialize, Serialize};

/// Schema generation of an open file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaVersion {
    V1,
    V2,
    V3,
    /// A version byte this build does not know.  Getters degrade to a
    /// sentinel and setters no-op instead of failing the whole file.
    Unknown(u8),
}

impl SchemaVersion {
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            1 => SchemaVersion::V1,
            2 => SchemaVersion::V2,
            3 => SchemaVersion::V3,
            other => SchemaVersion::Unknown(other),
        }
    }

    pub fn raw(self) -> u8 {
        match self {
            SchemaVersion::V1 => 1,
            SchemaVersion::V2 => 2,
            SchemaVersion::V3 => 3,
            SchemaVersion::Unknown(other) => other,
        }
    }

    pub fn is_v3(self) -> bool {
        self == SchemaVersion::V3
    }
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaVersion::V1 => write!(f, "1"),
            SchemaVersion::V2 => write!(f, "2"),
            SchemaVersion::V3 => write!(f, "3"),
            SchemaVersion::Unknown(other) => write!(f, "unknown({other})"),
        }
    }
}

/// Abstract per-record fields.  Numeric values are the V3 physical ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordField {
    Uuid,
    Group,
    Title,
    Username,
    Notes,
    Password,
    CreationTime,
    PasswordModTime,
    LastAccessTime,
    PasswordLifetime,
    LastModTime,
    Url,
    Autotype,
    PasswordHistory,
    PasswordPolicy,
    PasswordExpiryInterval,
    RunCommand,
    DoubleClickAction,
    Email,
    ProtectedEntry,
    OwnPasswordSymbols,
    PasswordPolicyName,
}

impl RecordField {
    /// The physical id in the newest (V3) schema.
    pub fn v3_id(self) -> u8 {
        match self {
            RecordField::Uuid => 1,
            RecordField::Group => 2,
            RecordField::Title => 3,
            RecordField::Username => 4,
            RecordField::Notes => 5,
            RecordField::Password => 6,
            RecordField::CreationTime => 7,
            RecordField::PasswordModTime => 8,
            RecordField::LastAccessTime => 9,
            RecordField::PasswordLifetime => 10,
            RecordField::LastModTime => 12,
            RecordField::Url => 13,
            RecordField::Autotype => 14,
            RecordField::PasswordHistory => 15,
            RecordField::PasswordPolicy => 16,
            RecordField::PasswordExpiryInterval => 17,
            RecordField::RunCommand => 18,
            RecordField::DoubleClickAction => 19,
            RecordField::Email => 20,
            RecordField::ProtectedEntry => 21,
            RecordField::OwnPasswordSymbols => 22,
            RecordField::PasswordPolicyName => 24,
        }
    }
}

/// Abstract file-header fields.  Numeric values are the V3 physical ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderField {
    Version,
    Uuid,
    LastSaveTime,
    /// Legacy packed user+host field, still written for minor < 2.
    LastSaveWho,
    LastSaveWhat,
    LastSaveUser,
    LastSaveHost,
    NamedPolicies,
}

impl HeaderField {
    /// The physical id in the newest (V3) schema.
    pub fn v3_id(self) -> u8 {
        match self {
            HeaderField::Version => 0,
            HeaderField::Uuid => 1,
            HeaderField::LastSaveTime => 4,
            HeaderField::LastSaveWho => 5,
            HeaderField::LastSaveWhat => 6,
            HeaderField::LastSaveUser => 7,
            HeaderField::LastSaveHost => 8,
            HeaderField::NamedPolicies => 16,
        }
    }
}

/// Outcome of mapping an abstract field onto a schema version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRef {
    /// The field exists in this schema under the given physical id.
    Physical(u8),
    /// The schema has no slot for this field.  Getters read as absent,
    /// setters silently do nothing.
    NotPresent,
    /// The schema version itself is unknown.  Getters read as a
    /// sentinel, setters silently do nothing.
    Unsupported,
}

/// Map an abstract record field onto a schema version.
pub fn map_record_field(field: RecordField, version: SchemaVersion) -> FieldRef {
    use FieldRef::{NotPresent, Physical, Unsupported};
    use RecordField::*;

    match version {
        SchemaVersion::V3 => Physical(field.v3_id()),
        SchemaVersion::V2 => match field {
            Uuid => Physical(1),
            Group => Physical(2),
            Title => Physical(3),
            Username => Physical(4),
            Notes => Physical(5),
            Password => Physical(6),
            PasswordLifetime => Physical(10),
            Url => Physical(13),
            _ => NotPresent,
        },
        SchemaVersion::V1 => match field {
            Title => Physical(3),
            Username => Physical(4),
            Notes => Physical(5),
            Password => Physical(6),
            // V1 has no on-disk UUID; id 7 is a phantom slot the loader
            // fills so records can still be addressed uniformly.
            Uuid => Physical(7),
            _ => NotPresent,
        },
        SchemaVersion::Unknown(_) => Unsupported,
    }
}

/// Map an abstract header field onto a schema version.
///
/// Only V3 files carry a header record; V1/V2 header fields read as
/// absent.
pub fn map_header_field(field: HeaderField, version: SchemaVersion) -> FieldRef {
    match version {
        SchemaVersion::V3 => FieldRef::Physical(field.v3_id()),
        SchemaVersion::V1 | SchemaVersion::V2 => FieldRef::NotPresent,
        SchemaVersion::Unknown(_) => FieldRef::Unsupported,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v3_mapping_is_identity() {
        assert_eq!(
            map_record_field(RecordField::Email, SchemaVersion::V3),
            FieldRef::Physical(20)
        );
        assert_eq!(
            map_record_field(RecordField::PasswordPolicyName, SchemaVersion::V3),
            FieldRef::Physical(24)
        );
        assert_eq!(
            map_header_field(HeaderField::NamedPolicies, SchemaVersion::V3),
            FieldRef::Physical(16)
        );
    }

    #[test]
    fn v2_keeps_legacy_subset() {
        assert_eq!(
            map_record_field(RecordField::Url, SchemaVersion::V2),
            FieldRef::Physical(13)
        );
        assert_eq!(
            map_record_field(RecordField::PasswordLifetime, SchemaVersion::V2),
            FieldRef::Physical(10)
        );
        assert_eq!(
            map_record_field(RecordField::Email, SchemaVersion::V2),
            FieldRef::NotPresent
        );
        assert_eq!(
            map_record_field(RecordField::ProtectedEntry, SchemaVersion::V2),
            FieldRef::NotPresent
        );
    }

    #[test]
    fn v1_uses_phantom_uuid_slot() {
        assert_eq!(
            map_record_field(RecordField::Uuid, SchemaVersion::V1),
            FieldRef::Physical(7)
        );
        assert_eq!(
            map_record_field(RecordField::Group, SchemaVersion::V1),
            FieldRef::NotPresent
        );
    }

    #[test]
    fn header_fields_absent_before_v3() {
        assert_eq!(
            map_header_field(HeaderField::Version, SchemaVersion::V2),
            FieldRef::NotPresent
        );
        assert_eq!(
            map_header_field(HeaderField::LastSaveUser, SchemaVersion::V1),
            FieldRef::NotPresent
        );
    }

    #[test]
    fn unknown_schema_is_unsupported() {
        let v = SchemaVersion::from_raw(9);
        assert_eq!(v, SchemaVersion::Unknown(9));
        assert_eq!(
            map_record_field(RecordField::Title, v),
            FieldRef::Unsupported
        );
        assert_eq!(map_header_field(HeaderField::Uuid, v), FieldRef::Unsupported);
    }
}
