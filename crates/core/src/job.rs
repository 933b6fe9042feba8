//! The compilation job pipeline.
//!
//! [`JobHandler::handle`] runs one request through, strictly in order:
//!
//! 1. Validate the request and identify the caller.
//! 2. Allocate a workspace and write the four job files.
//! 3. Run the compiler inside the workspace.
//! 4. Hand a telemetry record to the sink.
//!
//! A failure at any step ends the job; later steps never run. Telemetry is
//! best-effort: a sink error is logged and the compiled CSS is still
//! returned.

use std::sync::Arc;

use crate::caller::CallerMatcher;
use crate::compiler::TailwindCompiler;
use crate::error::JobError;
use crate::storage::WorkspaceStorage;
use crate::telemetry::{NewTelemetryRecord, TelemetrySink};
use crate::types::JobId;
use crate::validation::{self, BuildRequest};
use crate::workspace::JobWorkspace;

/// A finished job.
#[derive(Debug, Clone)]
pub struct CompiledJob {
    pub job_id: JobId,
    pub css: String,
}

/// Runs compilation jobs against explicit collaborators.
///
/// Holds no per-request state, so one instance serves concurrent requests.
pub struct JobHandler {
    storage: Arc<dyn WorkspaceStorage>,
    compiler: TailwindCompiler,
    matcher: Arc<dyn CallerMatcher>,
    telemetry: Arc<dyn TelemetrySink>,
}

impl JobHandler {
    pub fn new(
        storage: Arc<dyn WorkspaceStorage>,
        compiler: TailwindCompiler,
        matcher: Arc<dyn CallerMatcher>,
        telemetry: Arc<dyn TelemetrySink>,
    ) -> Self {
        Self {
            storage,
            compiler,
            matcher,
            telemetry,
        }
    }

    pub fn compiler(&self) -> &TailwindCompiler {
        &self.compiler
    }

    pub async fn handle(&self, request: &BuildRequest) -> Result<CompiledJob, JobError> {
        let caller = validation::validate(request, self.matcher.as_ref()).inspect_err(|e| {
            tracing::debug!(field = e.field, error = %e, "Rejected build request");
        })?;

        let workspace = JobWorkspace::allocate(self.storage.as_ref());
        let job_id = workspace.id();
        workspace
            .materialize(self.storage.as_ref(), request)
            .await?;

        let output = self
            .compiler
            .compile(workspace.dir())
            .await
            .inspect_err(|e| {
                tracing::warn!(%job_id, error = %e, "Compilation failed");
            })?;

        tracing::info!(
            %job_id,
            duration_ms = output.duration_ms,
            memory_bytes = output.memory_bytes,
            client = %caller.client_name,
            site = %caller.site_identifier,
            "Compilation succeeded"
        );

        let record = NewTelemetryRecord {
            job_id,
            duration_ms: i64::try_from(output.duration_ms).unwrap_or(i64::MAX),
            memory_bytes: i64::try_from(output.memory_bytes).unwrap_or(i64::MAX),
            compiler_version: self.compiler.version().to_string(),
            caller_client_name: caller.client_name,
            caller_site_identifier: caller.site_identifier,
        };
        if let Err(e) = self.telemetry.record(record).await {
            tracing::error!(%job_id, error = %e, "Failed to record telemetry");
        }

        Ok(CompiledJob {
            job_id,
            css: output.css,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use assert_matches::assert_matches;
    use async_trait::async_trait;

    use super::*;
    use crate::caller::WordPressAgentMatcher;
    use crate::compiler::test_helpers::stub_compiler;
    use crate::compiler::CompilerError;
    use crate::storage::LocalStorage;
    use crate::telemetry::TelemetryError;
    use crate::workspace::{CONFIG_JS, CONTENT_HTML, INPUT_CSS, PRESET_JS};

    #[derive(Default)]
    struct RecordingSink {
        records: Mutex<Vec<NewTelemetryRecord>>,
    }

    impl RecordingSink {
        fn records(&self) -> Vec<NewTelemetryRecord> {
            self.records.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl TelemetrySink for RecordingSink {
        async fn record(&self, record: NewTelemetryRecord) -> Result<(), TelemetryError> {
            self.records.lock().expect("lock").push(record);
            Ok(())
        }
    }

    struct BrokenSink;

    #[async_trait]
    impl TelemetrySink for BrokenSink {
        async fn record(&self, _record: NewTelemetryRecord) -> Result<(), TelemetryError> {
            Err(TelemetryError::Database("connection refused".into()))
        }
    }

    struct Fixture {
        bin_dir: tempfile::TempDir,
        storage_dir: tempfile::TempDir,
        storage: Arc<LocalStorage>,
        sink: Arc<RecordingSink>,
    }

    impl Fixture {
        async fn new() -> Self {
            let storage_dir = tempfile::tempdir().expect("tempdir");
            let storage = Arc::new(LocalStorage::open(storage_dir.path()).await.expect("open"));
            Self {
                bin_dir: tempfile::tempdir().expect("tempdir"),
                storage_dir,
                storage,
                sink: Arc::new(RecordingSink::default()),
            }
        }

        fn handler(&self, script: &str) -> JobHandler {
            self.handler_with_sink(script, self.sink.clone())
        }

        fn handler_with_sink(&self, script: &str, sink: Arc<dyn TelemetrySink>) -> JobHandler {
            let stub = stub_compiler(self.bin_dir.path(), script);
            JobHandler::new(
                self.storage.clone(),
                TailwindCompiler::new(stub, "3.2.4", Duration::from_secs(5)),
                Arc::new(WordPressAgentMatcher),
                sink,
            )
        }

        fn job_dirs(&self) -> usize {
            std::fs::read_dir(self.storage_dir.path())
                .expect("read storage root")
                .count()
        }

        fn job_dir(&self, job_id: JobId) -> std::path::PathBuf {
            self.storage.root().join(job_id.to_string())
        }
    }

    fn valid_request() -> BuildRequest {
        BuildRequest {
            css: "@tailwind utilities;".into(),
            preset: "tailwind.config = {\n  theme: {},\n}".into(),
            content: "<div class=\"text-red-500\"></div>".into(),
            caller_agent: "WordPress/6.1; example.com".into(),
        }
    }

    #[tokio::test]
    async fn successful_job_returns_css_and_records_telemetry() {
        let fx = Fixture::new().await;
        let handler = fx.handler("printf '.a{color:red}'");

        let job = handler.handle(&valid_request()).await.expect("handle");

        assert_eq!(job.css, ".a{color:red}");
        assert_eq!(job.job_id.get_version_num(), 4);

        let records = fx.sink.records();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.job_id, job.job_id);
        assert_eq!(record.compiler_version, "3.2.4");
        assert_eq!(record.caller_client_name, "6.1");
        assert_eq!(record.caller_site_identifier, "example.com");
        assert!(record.duration_ms >= 0);
        assert!(record.memory_bytes >= 0);
    }

    #[tokio::test]
    async fn successful_job_leaves_workspace_files() {
        let fx = Fixture::new().await;
        let handler = fx.handler("printf ok");

        let job = handler.handle(&valid_request()).await.expect("handle");

        let dir = fx.job_dir(job.job_id);
        for file in [INPUT_CSS, PRESET_JS, CONTENT_HTML, CONFIG_JS] {
            assert!(dir.join(file).is_file(), "{file} missing");
        }
    }

    #[tokio::test]
    async fn compiler_sees_materialized_workspace() {
        let fx = Fixture::new().await;
        let handler = fx.handler("cat preset.js");

        let job = handler.handle(&valid_request()).await.expect("handle");

        assert_eq!(job.css, "module.exports = {\n  theme: {},\n}");
    }

    #[tokio::test]
    async fn invalid_request_creates_nothing() {
        let fx = Fixture::new().await;
        let handler = fx.handler("printf never");

        for request in [
            BuildRequest {
                css: String::new(),
                ..valid_request()
            },
            BuildRequest {
                preset: String::new(),
                ..valid_request()
            },
            BuildRequest {
                content: String::new(),
                ..valid_request()
            },
            BuildRequest {
                caller_agent: "Mozilla/5.0".into(),
                ..valid_request()
            },
        ] {
            let err = handler.handle(&request).await.unwrap_err();
            assert_matches!(err, JobError::Validation(_));
        }

        assert_eq!(fx.job_dirs(), 0);
        assert!(fx.sink.records().is_empty());
    }

    #[tokio::test]
    async fn compiler_failure_skips_telemetry() {
        let fx = Fixture::new().await;
        let handler = fx.handler("echo 'syntax error' >&2; exit 1");

        let err = handler.handle(&valid_request()).await.unwrap_err();

        assert_matches!(err, JobError::Compiler(CompilerError::Failed { .. }));
        assert_eq!(err.to_string(), "syntax error");
        assert!(fx.sink.records().is_empty());
    }

    #[tokio::test]
    async fn compiler_timeout_skips_telemetry() {
        let fx = Fixture::new().await;
        let stub = stub_compiler(fx.bin_dir.path(), "sleep 30");
        let handler = JobHandler::new(
            fx.storage.clone(),
            TailwindCompiler::new(stub, "3.2.4", Duration::from_millis(200)),
            Arc::new(WordPressAgentMatcher),
            fx.sink.clone(),
        );

        let err = handler.handle(&valid_request()).await.unwrap_err();

        assert_matches!(err, JobError::Compiler(CompilerError::Timeout { .. }));
        assert!(fx.sink.records().is_empty());
    }

    #[tokio::test]
    async fn telemetry_failure_still_returns_css() {
        let fx = Fixture::new().await;
        let handler = fx.handler_with_sink("printf '.b{}'", Arc::new(BrokenSink));

        let job = handler.handle(&valid_request()).await.expect("handle");

        assert_eq!(job.css, ".b{}");
    }

    #[tokio::test]
    async fn unwritable_storage_reports_first_file() {
        let fx = Fixture::new().await;
        let stub = stub_compiler(fx.bin_dir.path(), "printf never");
        let root = fx.storage_dir.path().join("blocked");
        let storage = Arc::new(LocalStorage::open(&root).await.expect("open"));
        let handler = JobHandler::new(
            Arc::new(BlockedStorage(storage)),
            TailwindCompiler::new(stub, "3.2.4", Duration::from_secs(5)),
            Arc::new(WordPressAgentMatcher),
            fx.sink.clone(),
        );

        let err = handler.handle(&valid_request()).await.unwrap_err();

        assert_eq!(err.to_string(), "Failed to warm up the compiler [input.css].");
        assert!(fx.sink.records().is_empty());
    }

    /// Local storage whose job directories are pre-empted by plain files.
    struct BlockedStorage(Arc<LocalStorage>);

    #[async_trait]
    impl WorkspaceStorage for BlockedStorage {
        fn locate(&self, key: &str) -> std::path::PathBuf {
            self.0.locate(key)
        }

        async fn write(
            &self,
            key: &str,
            contents: &[u8],
        ) -> Result<(), crate::storage::StorageError> {
            if let Some((job, _)) = key.split_once('/') {
                let blocker = self.0.locate(job);
                if !blocker.exists() {
                    std::fs::write(&blocker, b"").expect("seed blocker");
                }
            }
            self.0.write(key, contents).await
        }
    }

    #[tokio::test]
    async fn concurrent_jobs_get_distinct_workspaces() {
        let fx = Fixture::new().await;
        let handler = fx.handler("printf ok");

        let request = valid_request();
        let (a, b) = tokio::join!(handler.handle(&request), handler.handle(&request));
        let (a, b) = (a.expect("first"), b.expect("second"));

        assert_ne!(a.job_id, b.job_id);
        assert!(fx.job_dir(a.job_id).is_dir());
        assert!(fx.job_dir(b.job_id).is_dir());
        assert_eq!(fx.job_dirs(), 2);
        assert_eq!(fx.sink.records().len(), 2);
    }
}
