//! Generation engine seam.
//!
//! The job service treats the engine as an opaque async call:
//! `invoke(prompt, config) -> {plan, artifacts}`. [`GenerationEngine`] is
//! that call; [`http::HttpEngine`] is the production implementation that
//! talks to a remote agent service over HTTP.

pub mod engine;
pub mod http;

pub use engine::{
    Artifact, EngineError, GenerationEngine, GenerationOutput, GenerationRequest, InvokeConfig,
    DEFAULT_RECURSION_LIMIT,
};
