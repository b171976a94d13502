//! REST client for a remote generation service.
//!
//! Sends `POST {base_url}/invoke` with the prompt and step budget and maps
//! the reply onto [`GenerationOutput`] using [`reqwest`].
//!
//! Request body:
//!
//! ```json
//! { "job_id": "...", "input": { "user_prompt": "..." }, "config": { "recursion_limit": 100 } }
//! ```
//!
//! Response body (every field optional):
//!
//! ```json
//! { "plan": { ... }, "files": [ { "path": "index.html", "content": "..." } ], "error": null }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::engine::{
    Artifact, EngineError, GenerationEngine, GenerationOutput, GenerationRequest, InvokeConfig,
};

/// HTTP client for one generation service.
pub struct HttpEngine {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct InvokeBody<'a> {
    job_id: &'a str,
    input: InvokeInput<'a>,
    config: InvokeConfig,
}

#[derive(Serialize)]
struct InvokeInput<'a> {
    user_prompt: &'a str,
}

#[derive(Deserialize)]
struct InvokeReply {
    #[serde(default)]
    plan: Option<serde_json::Value>,
    #[serde(default)]
    files: Vec<Artifact>,
    #[serde(default)]
    error: Option<String>,
}

impl HttpEngine {
    /// Create a client for the service at `base_url`, e.g.
    /// `http://localhost:8100`. `timeout` bounds one whole invocation.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. On failure the body
    /// text is kept in [`EngineError::Api`] for debugging.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, EngineError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(EngineError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    fn parse_reply(body: &str) -> Result<GenerationOutput, EngineError> {
        let reply: InvokeReply = serde_json::from_str(body)
            .map_err(|e| EngineError::InvalidResponse(e.to_string()))?;

        if let Some(message) = reply.error.filter(|m| !m.is_empty()) {
            return Err(EngineError::Failed(message));
        }

        Ok(GenerationOutput {
            plan: reply.plan.filter(|p| !p.is_null()),
            artifacts: reply.files,
        })
    }
}

#[async_trait]
impl GenerationEngine for HttpEngine {
    async fn invoke(&self, request: GenerationRequest) -> Result<GenerationOutput, EngineError> {
        let body = InvokeBody {
            job_id: &request.job_id,
            input: InvokeInput {
                user_prompt: &request.prompt,
            },
            config: request.config,
        };

        tracing::debug!(
            job_id = %request.job_id,
            recursion_limit = request.config.recursion_limit,
            "Invoking generation engine",
        );

        let response = self
            .client
            .post(format!("{}/invoke", self.base_url))
            .json(&body)
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        let text = response.text().await?;
        Self::parse_reply(&text)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
