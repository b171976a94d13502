#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tokio::sync::Semaphore;
use tower::ServiceExt;

use appforge_api::config::{JobsConfig, ServerConfig};
use appforge_api::executor::{ExecutorSettings, JobExecutor};
use appforge_api::registry::JobRegistry;
use appforge_api::router::build_app_router;
use appforge_api::state::AppState;
use appforge_engine::{
    Artifact, EngineError, GenerationEngine, GenerationOutput, GenerationRequest, InvokeConfig,
};

// ---------------------------------------------------------------------------
// Engine doubles
// ---------------------------------------------------------------------------

/// Returns the same output for every prompt.
pub struct StaticEngine {
    pub output: GenerationOutput,
}

#[async_trait]
impl GenerationEngine for StaticEngine {
    async fn invoke(&self, _request: GenerationRequest) -> Result<GenerationOutput, EngineError> {
        Ok(self.output.clone())
    }
}

/// Fails every invocation with the given message.
pub struct FailingEngine(pub &'static str);

#[async_trait]
impl GenerationEngine for FailingEngine {
    async fn invoke(&self, _request: GenerationRequest) -> Result<GenerationOutput, EngineError> {
        Err(EngineError::Failed(self.0.to_string()))
    }
}

/// Panics inside the engine call.
pub struct PanickingEngine;

#[async_trait]
impl GenerationEngine for PanickingEngine {
    async fn invoke(&self, _request: GenerationRequest) -> Result<GenerationOutput, EngineError> {
        panic!("engine blew up");
    }
}

/// Blocks every invocation until a matching [`GatedEngine::release_one`],
/// then succeeds with `output`. Counts invocations started so far.
pub struct GatedEngine {
    pub output: GenerationOutput,
    gate: Semaphore,
    started: AtomicUsize,
}

impl GatedEngine {
    pub fn new(output: GenerationOutput) -> Arc<Self> {
        Arc::new(Self {
            output,
            gate: Semaphore::new(0),
            started: AtomicUsize::new(0),
        })
    }

    /// Let exactly one waiting (or future) invocation through.
    pub fn release_one(&self) {
        self.gate.add_permits(1);
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationEngine for GatedEngine {
    async fn invoke(&self, _request: GenerationRequest) -> Result<GenerationOutput, EngineError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.gate.acquire().await.expect("gate closed").forget();
        Ok(self.output.clone())
    }
}

/// Records every request it receives and echoes the prompt into the plan.
#[derive(Default)]
pub struct RecordingEngine {
    pub requests: std::sync::Mutex<Vec<GenerationRequest>>,
}

#[async_trait]
impl GenerationEngine for RecordingEngine {
    async fn invoke(&self, request: GenerationRequest) -> Result<GenerationOutput, EngineError> {
        let plan = json!({ "prompt": request.prompt });
        self.requests.lock().unwrap().push(request);
        Ok(GenerationOutput {
            plan: Some(plan),
            artifacts: vec![],
        })
    }
}

/// A typical successful engine result: a plan plus three web files.
pub fn todo_app_output() -> GenerationOutput {
    GenerationOutput {
        plan: Some(json!({ "name": "Todo App", "techstack": "html, css, js" })),
        artifacts: vec![
            artifact("index.html", "<html><body>todo</body></html>"),
            artifact("style.css", "body { margin: 0; }"),
            artifact("script.js", "console.log('todo');"),
        ],
    }
}

pub fn artifact(path: &str, content: &str) -> Artifact {
    Artifact {
        path: path.to_string(),
        content: content.to_string(),
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// A running test application and the pieces tests poke at directly.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    /// Keeps the output root alive for the duration of the test.
    pub output_root: tempfile::TempDir,
}

impl TestApp {
    pub fn output_root(&self) -> &Path {
        self.output_root.path()
    }

    pub fn job_dir(&self, id: &str) -> PathBuf {
        self.output_root.path().join(id)
    }
}

/// Build a test `ServerConfig` with safe defaults.
///
/// Uses `http://localhost:5173` as CORS origin (matching the dev default)
/// and a 30-second request timeout.
pub fn test_config(output_root: &Path, max_concurrent_jobs: usize) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        static_dir: output_root.join("no-static-dir"),
        jobs: JobsConfig {
            engine_url: "http://127.0.0.1:1".to_string(),
            engine_timeout_secs: 5,
            recursion_limit: 100,
            max_concurrent_jobs,
            output_root: output_root.to_path_buf(),
        },
    }
}

/// Build the full application router around `engine`.
///
/// Uses the same [`build_app_router`] as `main.rs` so integration tests
/// exercise the production middleware stack.
pub fn build_test_app(engine: Arc<dyn GenerationEngine>) -> TestApp {
    build_test_app_with(engine, 8, |_| {})
}

/// Like [`build_test_app`] with a concurrency cap and a config hook.
pub fn build_test_app_with(
    engine: Arc<dyn GenerationEngine>,
    max_concurrent_jobs: usize,
    customize: impl FnOnce(&mut ServerConfig),
) -> TestApp {
    let output_root = tempfile::tempdir().expect("tempdir");
    let mut config = test_config(output_root.path(), max_concurrent_jobs);
    customize(&mut config);

    let registry = Arc::new(JobRegistry::new());
    let executor = JobExecutor::new(
        Arc::clone(&registry),
        engine,
        ExecutorSettings {
            output_root: config.jobs.output_root.clone(),
            invoke: InvokeConfig {
                recursion_limit: config.jobs.recursion_limit,
            },
            max_concurrent: config.jobs.max_concurrent_jobs,
        },
    );

    let state = AppState::new(config.clone(), registry, executor);
    let router = build_app_router(state.clone(), &config);

    TestApp {
        router,
        state,
        output_root,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

/// Send a GET request and return the response.
pub async fn get(app: &Router, uri: &str) -> Response<axum::body::Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// Send a POST request with a JSON body and return the response.
pub async fn post_json(app: &Router, uri: &str, body: Value) -> Response<axum::body::Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap();
    app.clone().oneshot(request).await.unwrap()
}

/// Collect a response body into JSON.
pub async fn body_json(response: Response<axum::body::Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// GET `uri`, assert 200, and return the JSON body.
pub async fn get_ok(app: &Router, uri: &str) -> Value {
    let response = get(app, uri).await;
    assert_eq!(response.status(), StatusCode::OK, "GET {uri}");
    body_json(response).await
}

/// Submit `prompt` and return the new job id.
pub async fn submit(app: &Router, prompt: &str) -> String {
    let response = post_json(app, "/generate", json!({ "prompt": prompt })).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    json["id"].as_str().expect("id is a string").to_string()
}

/// Poll `/status/{id}` until the job leaves `processing`.
///
/// Panics if the job is still processing after five seconds.
pub async fn wait_for_terminal(app: &Router, id: &str) -> Value {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let json = get_ok(app, &format!("/status/{id}")).await;
        if json["status"] != "processing" {
            return json;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "job {id} still processing after 5s"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Wait until `condition` holds, checking every 10ms for up to five seconds.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within 5s"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
