//! Timestamp and identifier helpers.

mod ids;
mod timestamps;

pub use ids::generate_run_id;
pub use timestamps::{iso_timestamp, now_millis};
