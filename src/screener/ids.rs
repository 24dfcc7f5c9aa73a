//! Random identifiers for sessions and request correlation.

use uuid::Uuid;

/// Source of opaque identifiers.
///
/// Used once per flow for the session id and once per HTTP call for the
/// `x-correlation-id` header. Tests swap in a deterministic generator.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random version-4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidV4Ids;

impl IdGenerator for UuidV4Ids {
    fn generate(&self) -> String {
        Uuid::new_v4().to_string()
    }
}
