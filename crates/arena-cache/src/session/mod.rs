//! Session tracking.

mod registry;

pub use registry::{SessionMetadata, SessionRegistry};
