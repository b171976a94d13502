//! Domain types and filesystem logic for the AppForge job service.
//!
//! Nothing in this crate knows about HTTP or the generation engine; it
//! holds the job record model and the hardened artifact accessors that the
//! API layer builds on.

pub mod artifacts;
pub mod error;
pub mod job;
pub mod types;
