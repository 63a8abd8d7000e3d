//! External id generation.
//!
//! Ids are random v4 UUIDs rendered hyphenated and lowercase. They are
//! generated by the service, never by the backend.

use streambot_shared::ExternalId;
use uuid::Uuid;

/// Source of fresh external ids. Must be safe to call concurrently.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> ExternalId;
}

/// Generates random (v4) UUIDs.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn next_id(&self) -> ExternalId {
        new_external_id()
    }
}

/// Produce a new external id.
pub fn new_external_id() -> ExternalId {
    ExternalId::new(Uuid::new_v4().hyphenated().to_string())
}

/// Whether `id` has the shape produced by [`new_external_id`].
pub fn is_generated_id(id: &str) -> bool {
    match Uuid::parse_str(id) {
        Ok(uuid) => uuid.get_version_num() == 4 && uuid.hyphenated().to_string() == id,
        Err(_) => false,
    }
}
