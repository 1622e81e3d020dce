//! Cooperative cancellation for pipeline runs.
//!
//! A run checks its token before each node and races every executor call
//! against it; the in-flight request future is dropped on cancellation.

mod token;

pub use token::CancellationToken;
