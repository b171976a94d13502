//! AppForge API server library.
//!
//! Exposes the building blocks (config, state, registry, executor, routes)
//! so integration tests and the binary entrypoint can both access them.

pub mod artifacts;
pub mod config;
pub mod error;
pub mod executor;
pub mod handlers;
pub mod registry;
pub mod router;
pub mod routes;
pub mod state;
pub mod submitter;
