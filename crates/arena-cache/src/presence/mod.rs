//! Typed presence and session records.

mod records;

pub use records::{PresenceRecord, SessionRecord};
