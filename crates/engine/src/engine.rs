//! Engine trait and the typed request/response it exchanges.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Step budget handed to the engine when none is configured.
pub const DEFAULT_RECURSION_LIMIT: u32 = 100;

/// Per-invocation engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeConfig {
    /// Soft bound on agent steps. The engine enforces it, not the caller.
    pub recursion_limit: u32,
}

impl Default for InvokeConfig {
    fn default() -> Self {
        Self {
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }
}

/// One generation request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Job the request belongs to, for correlation in engine logs.
    pub job_id: String,
    /// The user's prompt, forwarded verbatim (may be empty).
    pub prompt: String,
    pub config: InvokeConfig,
}

/// A file produced by the engine, relative to the job's output directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    pub path: String,
    pub content: String,
}

/// Successful engine result.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GenerationOutput {
    /// The engine's plan. `None` when the engine did not report one.
    pub plan: Option<serde_json::Value>,
    pub artifacts: Vec<Artifact>,
}

/// Engine failure. The `Display` text is what gets stored on the job.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine ran and reported a failure of its own.
    #[error("{0}")]
    Failed(String),

    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("Engine request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The engine returned a non-2xx status code.
    #[error("Engine API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The engine answered with a body that does not match the contract.
    #[error("Invalid engine response: {0}")]
    InvalidResponse(String),
}

/// The external generation engine.
///
/// Implementations must be safe to call concurrently; the executor runs
/// one invocation per job.
#[async_trait]
pub trait GenerationEngine: Send + Sync {
    async fn invoke(&self, request: GenerationRequest) -> Result<GenerationOutput, EngineError>;
}
