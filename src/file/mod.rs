//! The password file engine: field mapping across schema versions, the
//! policy/history codecs, alias and shortcut resolution, and the
//! `FileData` facade that ties them together over the container.

pub mod expiry;
pub mod field;
pub mod filedata;
pub mod filter;
pub mod hdrpolicy;
pub mod history;
pub mod policy;
pub mod record;
pub mod trigram;

pub use expiry::PasswdExpiration;
pub use field::{FieldRef, HeaderField, RecordField, SchemaVersion};
pub use filedata::{FileData, FileDataObserver, UNSUPPORTED_FIELD};
pub use filter::{MatchField, RecordFilter};
pub use hdrpolicy::HeaderPolicies;
pub use history::{History, HistoryEntry};
pub use policy::{Location, PasswdPolicy, PolicyContext, PolicyType};
pub use record::{PasswdRecord, RecordType};
