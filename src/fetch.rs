//! The per-job pipeline: idempotence check → fetch → normalize → persist.
//!
//! Every step maps its failure onto a [`FetchError`] variant; nothing here
//! returns early from the run. [`run_job`] always yields a
//! [`FetchOutcome`].
//!
//! The network side sits behind [`FetchSource`] so the pool can be driven
//! by [`HttpSource`] in production and by in-memory sources in tests.

use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::FetchError;
use crate::models::{FetchJob, FetchOutcome};

/// Something that can return the raw body behind a source locator.
#[async_trait]
pub trait FetchSource: Send + Sync {
    /// Fetch `locator`. Implementations map transport problems to
    /// [`FetchError::Transport`] and non-success responses to
    /// [`FetchError::Status`].
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, FetchError>;
}

/// HTTP GET with a fixed per-request timeout.
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("solat-sync/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl FetchSource for HttpSource {
    async fn fetch(&self, locator: &str) -> Result<Vec<u8>, FetchError> {
        let resp = self
            .client
            .get(locator)
            .send()
            .await
            .map_err(|e| FetchError::Transport(describe_reqwest_error(&e)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                code: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("").to_string(),
            });
        }

        let body = resp.bytes().await.map_err(|e| {
            FetchError::Transport(format!(
                "failed to read response body: {}",
                describe_reqwest_error(&e)
            ))
        })?;

        Ok(body.to_vec())
    }
}

fn describe_reqwest_error(err: &reqwest::Error) -> String {
    if err.is_timeout() {
        format!("timed out: {}", err)
    } else {
        err.to_string()
    }
}

/// Parse `body` as JSON, drop the top-level `volatile_fields`, and
/// reserialize with 2-space indentation and sorted keys.
///
/// Absent fields are not an error. The top level must be an object: an
/// array or scalar written to disk would be skipped by every later run.
pub fn normalize(body: &[u8], volatile_fields: &[String]) -> Result<String, FetchError> {
    let doc: Value =
        serde_json::from_slice(body).map_err(|e| FetchError::Parse(e.to_string()))?;

    let mut map = match doc {
        Value::Object(map) => map,
        other => {
            return Err(FetchError::Parse(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            )));
        }
    };
    for field in volatile_fields {
        map.remove(field);
    }

    serde_json::to_string_pretty(&map).map_err(|e| FetchError::Parse(e.to_string()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Write `contents` to a new file at `path`, creating parent directories.
///
/// Never overwrites: an existing file is a [`FetchError::Persist`]. A file
/// left half-written by a failed write is removed so the next run retries.
pub async fn persist(path: &Path, contents: &str) -> Result<(), FetchError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FetchError::persist(path, e))?;
        }
    }

    let file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| FetchError::persist(path, e))?;

    write_or_remove(path, file, contents).await
}

/// Write `contents` through `writer`, which was opened on `path`. On
/// failure the writer is closed and `path` removed.
async fn write_or_remove<W>(path: &Path, mut writer: W, contents: &str) -> Result<(), FetchError>
where
    W: AsyncWrite + Unpin,
{
    let written = async {
        writer.write_all(contents.as_bytes()).await?;
        writer.flush().await
    }
    .await;

    if let Err(e) = written {
        drop(writer);
        if let Err(cleanup) = tokio::fs::remove_file(path).await {
            tracing::warn!(path = %path.display(), error = %cleanup, "could not remove partial file");
        }
        return Err(FetchError::persist(path, e));
    }

    Ok(())
}

/// Run one job to completion.
pub async fn run_job(
    job: Arc<FetchJob>,
    source: &dyn FetchSource,
    volatile_fields: &[String],
) -> FetchOutcome {
    match tokio::fs::try_exists(&job.destination_path).await {
        Ok(true) => return FetchOutcome::skipped(job),
        Ok(false) => {}
        Err(e) => {
            let err = FetchError::persist(&job.destination_path, e);
            return FetchOutcome::failed(job, err);
        }
    }

    match fetch_and_store(&job, source, volatile_fields).await {
        Ok(()) => FetchOutcome::fetched(job),
        Err(e) => FetchOutcome::failed(job, e),
    }
}

async fn fetch_and_store(
    job: &FetchJob,
    source: &dyn FetchSource,
    volatile_fields: &[String],
) -> Result<(), FetchError> {
    let body = source.fetch(&job.source_locator).await?;
    let normalized = normalize(&body, volatile_fields)?;
    persist(&job.destination_path, &normalized).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::task::{Context as TaskContext, Poll};

    fn fields() -> Vec<String> {
        vec!["serverTime".to_string()]
    }

    struct StaticSource {
        reply: Result<Vec<u8>, FetchError>,
        calls: AtomicUsize,
    }

    impl StaticSource {
        fn new(reply: Result<&str, FetchError>) -> Self {
            Self {
                reply: reply.map(|s| s.as_bytes().to_vec()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl FetchSource for StaticSource {
        async fn fetch(&self, _locator: &str) -> Result<Vec<u8>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone()
        }
    }

    fn job_at(path: PathBuf) -> Arc<FetchJob> {
        Arc::new(FetchJob {
            category: "North".to_string(),
            zone_id: "Z1".to_string(),
            source_locator: "http://localhost/Z1".to_string(),
            destination_path: path,
        })
    }

    #[test]
    fn normalize_removes_server_time_only() {
        let body = br#"{"status":"OK!","serverTime":"2025-01-01 10:00:00","zone":"Z1","prayerTime":[{"date":"01-Jan-2025"}]}"#;
        let out = normalize(body, &fields()).unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();

        let expected = serde_json::json!({
            "status": "OK!",
            "zone": "Z1",
            "prayerTime": [{"date": "01-Jan-2025"}]
        });
        assert_eq!(parsed, expected);
        assert!(!out.contains("serverTime"));
    }

    #[test]
    fn normalize_uses_two_space_indent_and_sorted_keys() {
        let out = normalize(br#"{"b":1,"a":{"c":true}}"#, &fields()).unwrap();
        assert_eq!(out, "{\n  \"a\": {\n    \"c\": true\n  },\n  \"b\": 1\n}");
    }

    #[test]
    fn normalize_without_volatile_field_is_a_reformat() {
        let out = normalize(br#"{"zone":"Z1"}"#, &fields()).unwrap();
        assert_eq!(out, "{\n  \"zone\": \"Z1\"\n}");
    }

    #[test]
    fn normalize_keeps_nested_server_time() {
        let out = normalize(br#"{"meta":{"serverTime":"x"}}"#, &fields()).unwrap();
        assert!(out.contains("serverTime"));
    }

    #[test]
    fn normalize_rejects_malformed_body() {
        let err = normalize(b"<html>maintenance</html>", &fields()).unwrap_err();
        assert_eq!(err.category(), "parse");
    }

    #[test]
    fn normalize_rejects_non_object_documents() {
        let bodies: [&[u8]; 4] = [br#""maintenance""#, b"[1,2]", b"null", b"42"];
        for body in bodies {
            let err = normalize(body, &fields()).unwrap_err();
            assert_eq!(err.category(), "parse", "body {:?}", body);
            assert!(err.to_string().contains("expected a JSON object"));
        }
    }

    #[tokio::test]
    async fn non_object_body_fails_and_next_run_recovers() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("Z1-2025.json");

        let junk = StaticSource::new(Ok(r#""maintenance""#));
        let first = run_job(job_at(path.clone()), &junk, &fields()).await;
        assert_eq!(first.kind(), crate::models::OutcomeKind::Failed);
        assert!(!path.exists());

        let good = StaticSource::new(Ok(r#"{"zone":"Z1"}"#));
        let second = run_job(job_at(path.clone()), &good, &fields()).await;
        assert_eq!(second.kind(), crate::models::OutcomeKind::Fetched);
        assert_eq!(good.calls.load(Ordering::SeqCst), 1);
    }

    /// Accepts a few bytes, then reports the disk as full.
    struct FullDisk {
        accepted: usize,
    }

    impl AsyncWrite for FullDisk {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut TaskContext<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            if self.accepted == 0 {
                self.accepted = buf.len().min(4);
                Poll::Ready(Ok(self.accepted))
            } else {
                Poll::Ready(Err(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "no space left on device",
                )))
            }
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut TaskContext<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(
            self: Pin<&mut Self>,
            _cx: &mut TaskContext<'_>,
        ) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn failed_write_removes_partial_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("Z1-2025.json");
        std::fs::write(&path, "{\n  ").unwrap();

        let err = write_or_remove(&path, FullDisk { accepted: 0 }, "{\n  \"zone\": \"Z1\"\n}")
            .await
            .unwrap_err();

        assert_eq!(err.category(), "persist");
        assert!(err.to_string().contains("no space left"));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn persist_refuses_to_overwrite() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("2025").join("Z1-2025.json");

        persist(&path, "{}").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");

        let err = persist(&path, "{\"x\":1}").await.unwrap_err();
        assert_eq!(err.category(), "persist");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }

    #[tokio::test]
    async fn run_job_fetches_and_writes() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("2025").join("Z1-2025.json");
        let source = StaticSource::new(Ok(r#"{"serverTime":"now","zone":"Z1"}"#));

        let outcome = run_job(job_at(path.clone()), &source, &fields()).await;

        assert_eq!(outcome.kind(), crate::models::OutcomeKind::Fetched);
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "{\n  \"zone\": \"Z1\"\n}");
    }

    #[tokio::test]
    async fn run_job_skips_existing_without_fetching() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("Z1-2025.json");
        std::fs::write(&path, "original").unwrap();
        let source = StaticSource::new(Ok(r#"{"zone":"Z1"}"#));

        let outcome = run_job(job_at(path.clone()), &source, &fields()).await;

        assert_eq!(outcome.kind(), crate::models::OutcomeKind::SkippedExisting);
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "original");
    }

    #[tokio::test]
    async fn run_job_status_failure_writes_nothing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("Z1-2025.json");
        let source = StaticSource::new(Err(FetchError::Status {
            code: 500,
            reason: "Internal Server Error".to_string(),
        }));

        let outcome = run_job(job_at(path.clone()), &source, &fields()).await;

        assert_eq!(outcome.kind(), crate::models::OutcomeKind::Failed);
        assert!(outcome.failure().unwrap().to_string().contains("500"));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn run_job_parse_failure_writes_nothing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("Z1-2025.json");
        let source = StaticSource::new(Ok("not json"));

        let outcome = run_job(job_at(path.clone()), &source, &fields()).await;

        assert_eq!(outcome.failure().map(|e| e.category()), Some("parse"));
        assert!(!path.exists());
    }
}
