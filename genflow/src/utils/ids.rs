//! Identifier generation.

use uuid::Uuid;

/// Generates a fresh run id.
#[must_use]
pub fn generate_run_id() -> String {
    Uuid::new_v4().to_string()
}
