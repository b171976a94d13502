use std::path::PathBuf;
use std::str::FromStr;

use appforge_core::artifacts::DEFAULT_OUTPUT_ROOT;
use appforge_engine::DEFAULT_RECURSION_LIMIT;

/// Server configuration loaded from environment variables.
///
/// All fields except the engine URL have defaults suitable for local
/// development. In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `127.0.0.1`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for in-flight jobs, in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Directory served under `/static` when it exists (default: `static`).
    pub static_dir: PathBuf,
    /// Job execution settings.
    pub jobs: JobsConfig,
}

/// Settings for the generation engine and the job executor.
#[derive(Debug, Clone)]
pub struct JobsConfig {
    /// Base URL of the generation service.
    pub engine_url: String,
    /// HTTP timeout for a single engine invocation, in seconds (default: `600`).
    pub engine_timeout_secs: u64,
    /// Step budget handed to the engine (default: `100`).
    pub recursion_limit: u32,
    /// Maximum number of engine invocations running at once (default: `4`).
    pub max_concurrent_jobs: usize,
    /// Parent of the per-job output directories (default: `generated_project`).
    pub output_root: PathBuf,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                    |
    /// |-------------------------|----------------------------|
    /// | `HOST`                  | `127.0.0.1`                |
    /// | `PORT`                  | `8000`                     |
    /// | `CORS_ORIGINS`          | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                       |
    /// | `STATIC_DIR`            | `static`                   |
    ///
    /// Panics on values that do not parse; misconfiguration should fail
    /// at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".into());
        let port: u16 = env_or("PORT", 8000);

        let cors_origins = parse_origins(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".into()),
        );

        let request_timeout_secs: u64 = env_or("REQUEST_TIMEOUT_SECS", 30);
        let shutdown_timeout_secs: u64 = env_or("SHUTDOWN_TIMEOUT_SECS", 30);
        let static_dir = PathBuf::from(std::env::var("STATIC_DIR").unwrap_or_else(|_| "static".into()));

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            static_dir,
            jobs: JobsConfig::from_env(),
        }
    }
}

impl JobsConfig {
    /// | Env Var               | Default             |
    /// |-----------------------|---------------------|
    /// | `ENGINE_URL`          | (required)          |
    /// | `ENGINE_TIMEOUT_SECS` | `600`               |
    /// | `RECURSION_LIMIT`     | `100`               |
    /// | `MAX_CONCURRENT_JOBS` | `4`                 |
    /// | `OUTPUT_ROOT`         | `generated_project` |
    pub fn from_env() -> Self {
        let engine_url = std::env::var("ENGINE_URL").expect("ENGINE_URL must be set");
        let engine_timeout_secs: u64 = env_or("ENGINE_TIMEOUT_SECS", 600);
        let recursion_limit: u32 = env_or("RECURSION_LIMIT", DEFAULT_RECURSION_LIMIT);

        let max_concurrent_jobs: usize = env_or("MAX_CONCURRENT_JOBS", 4);
        assert!(max_concurrent_jobs > 0, "MAX_CONCURRENT_JOBS must be at least 1");

        let output_root = PathBuf::from(
            std::env::var("OUTPUT_ROOT").unwrap_or_else(|_| DEFAULT_OUTPUT_ROOT.into()),
        );

        Self {
            engine_url,
            engine_timeout_secs,
            recursion_limit,
            max_concurrent_jobs,
            output_root,
        }
    }
}

/// Read `key` from the environment, falling back to `default` when unset.
fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|e| panic!("{key} must be a valid {}: {e}", std::any::type_name::<T>())),
        Err(_) => default,
    }
}

/// Split a comma-separated origin list, dropping blanks.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
