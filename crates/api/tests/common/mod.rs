#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tailpress_api::config::{
    CompilerConfig, LogFormat, ServerConfig, TelemetryConfig, TelemetryMode,
};
use tailpress_api::router::build_app_router;
use tailpress_api::state::AppState;
use tailpress_api::telemetry::PgTelemetrySink;
use tailpress_core::caller::WordPressAgentMatcher;
use tailpress_core::compiler::TailwindCompiler;
use tailpress_core::job::JobHandler;
use tailpress_core::storage::{LocalStorage, WorkspaceStorage};
use tempfile::TempDir;
use tower::ServiceExt;

/// Agent string of a recognised WordPress site.
pub const WORDPRESS_AGENT: &str = "WordPress/6.1; https://example.com";

/// Compiler stub that prints a fixed stylesheet.
pub const SUCCESS_SCRIPT: &str = "printf '.a{color:red}'";

pub const PRESET: &str = "tailwind.config = {\n  theme: {}\n}";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(binary: &Path, storage_root: &Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        database_url: "postgres://unused-by-tests".to_string(),
        redirect_url: "https://tailwindcss.com".to_string(),
        log_format: LogFormat::Pretty,
        compiler: CompilerConfig {
            binary: binary.to_path_buf(),
            version: "3.2.4".to_string(),
            storage_root: storage_root.to_path_buf(),
            timeout: Duration::from_secs(5),
        },
        telemetry: TelemetryConfig {
            mode: TelemetryMode::Inline,
            queue_capacity: 16,
        },
    }
}

/// Router plus the temporary directories backing it.
pub struct TestApp {
    pub router: Router,
    pub storage_root: PathBuf,
    pub binary: PathBuf,
    _bin_dir: TempDir,
    _storage_dir: TempDir,
}

impl TestApp {
    /// Job directories created so far.
    pub fn job_dirs(&self) -> Vec<PathBuf> {
        std::fs::read_dir(&self.storage_root)
            .map(|entries| {
                entries
                    .filter_map(Result::ok)
                    .map(|e| e.path())
                    .filter(|p| p.is_dir())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Build the full application with a fake compiler running `script`.
///
/// Telemetry is inserted inline so tests can query it right after the
/// response.
pub async fn build_test_app(pool: PgPool, script: &str) -> TestApp {
    build_test_app_with_timeout(pool, script, Duration::from_secs(5)).await
}

pub async fn build_test_app_with_timeout(
    pool: PgPool,
    script: &str,
    compiler_timeout: Duration,
) -> TestApp {
    build_test_app_with(pool, script, |config| config.compiler.timeout = compiler_timeout).await
}

/// Build the application over local storage, adjusting the config first.
pub async fn build_test_app_with(
    pool: PgPool,
    script: &str,
    configure: impl FnOnce(&mut ServerConfig),
) -> TestApp {
    let storage_dir = tempfile::tempdir().unwrap();
    let storage = LocalStorage::open(storage_dir.path()).await.unwrap();
    let storage_root = storage.root().to_path_buf();

    build_test_app_with_storage(
        pool,
        script,
        configure,
        Arc::new(storage),
        storage_root,
        storage_dir,
    )
}

/// Build the application over an arbitrary storage backend.
pub fn build_test_app_with_storage(
    pool: PgPool,
    script: &str,
    configure: impl FnOnce(&mut ServerConfig),
    storage: Arc<dyn WorkspaceStorage>,
    storage_root: PathBuf,
    storage_dir: TempDir,
) -> TestApp {
    let bin_dir = tempfile::tempdir().unwrap();
    let binary = write_stub_compiler(bin_dir.path(), script);

    let mut config = test_config(&binary, &storage_root);
    configure(&mut config);

    let compiler = TailwindCompiler::new(
        &config.compiler.binary,
        &config.compiler.version,
        config.compiler.timeout,
    );
    let jobs = JobHandler::new(
        storage,
        compiler,
        Arc::new(WordPressAgentMatcher),
        Arc::new(PgTelemetrySink::new(pool.clone())),
    );

    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        jobs: Arc::new(jobs),
    };

    TestApp {
        router: build_app_router(state, &config),
        storage_root,
        binary,
        _bin_dir: bin_dir,
        _storage_dir: storage_dir,
    }
}

/// Write an executable `sh` script standing in for the Tailwind CLI.
pub fn write_stub_compiler(dir: &Path, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join("tailwindcss");
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// A complete, valid compile body.
pub fn valid_body() -> serde_json::Value {
    serde_json::json!({
        "css": "@tailwind base;\n@tailwind components;\n@tailwind utilities;",
        "preset": PRESET,
        "content": "<div class=\"a\"></div>",
    })
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// POST a raw body to `/` with the given user agent.
pub async fn post_raw(app: Router, agent: Option<&str>, body: impl Into<Body>) -> Response<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/")
        .header("content-type", "application/json");
    if let Some(agent) = agent {
        builder = builder.header("user-agent", agent);
    }
    app.oneshot(builder.body(body.into()).unwrap()).await.unwrap()
}

pub async fn post_json(app: Router, agent: Option<&str>, body: &serde_json::Value) -> Response<Body> {
    post_raw(app, agent, body.to_string()).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
