//! Asynchronous append-only log sink.
//!
//! Handlers enqueue records and move on; a single writer task owns both
//! files. Because there is one FIFO queue, a request's audit entry always
//! lands before its attempt entry. The queue is bounded: when the writer
//! falls behind, new entries are dropped and counted as failures rather
//! than delaying the response.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::oneshot;

use crate::audit::record::{AttemptRecord, RequestRecord};
use crate::config::AuditConfig;
use crate::observability::metrics;

/// A failed append. Reported to the operational log only.
#[derive(Debug, Error)]
pub enum AuditWriteError {
    #[error("failed to serialize audit record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to append to {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

enum SinkMessage {
    Audit(RequestRecord),
    Attempt(AttemptRecord),
    Flush(oneshot::Sender<()>),
}

/// Cloneable handle to the log writer task.
#[derive(Debug, Clone)]
pub struct AuditSink {
    tx: mpsc::Sender<SinkMessage>,
    failures: Arc<AtomicU64>,
}

impl std::fmt::Debug for SinkMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkMessage::Audit(r) => write!(f, "Audit({})", r.request_id),
            SinkMessage::Attempt(r) => write!(f, "Attempt({})", r.request_id),
            SinkMessage::Flush(_) => f.write_str("Flush"),
        }
    }
}

impl AuditSink {
    /// Start the writer task. Must be called inside a Tokio runtime.
    pub fn spawn(config: &AuditConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let failures = Arc::new(AtomicU64::new(0));

        let writer = AuditWriter {
            audit_path: config.audit_log_path.clone(),
            attempt_path: config.attempt_log_path.clone(),
            failures: failures.clone(),
        };
        tokio::spawn(writer.run(rx));

        Self { tx, failures }
    }

    /// Queue a verbose audit entry.
    pub fn record(&self, record: RequestRecord) {
        tracing::info!(
            target: "audit",
            request_id = %record.request_id,
            ip = %record.source_ip,
            note = %record.note,
            "Impacted {} {} from {}",
            record.method,
            record.path,
            record.source_ip,
        );
        self.send(SinkMessage::Audit(record));
    }

    /// Queue an attempt-log line.
    pub fn record_attempt(&self, record: AttemptRecord) {
        self.send(SinkMessage::Attempt(record));
    }

    /// Wait until everything queued so far has been written (or has failed).
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(SinkMessage::Flush(done_tx)).await.is_err() {
            tracing::error!("Audit writer is gone, nothing to flush");
            return;
        }
        let _ = done_rx.await;
    }

    /// Number of appends that failed since startup.
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    fn send(&self, message: SinkMessage) {
        match self.tx.try_send(message) {
            Ok(()) => return,
            Err(TrySendError::Full(message)) => {
                tracing::warn!(message = ?message, "Audit queue full, entry dropped")
            }
            Err(TrySendError::Closed(message)) => {
                tracing::error!(message = ?message, "Audit writer is gone, entry lost")
            }
        }
        self.failures.fetch_add(1, Ordering::Relaxed);
        metrics::record_audit_failure();
    }
}

struct AuditWriter {
    audit_path: PathBuf,
    attempt_path: PathBuf,
    failures: Arc<AtomicU64>,
}

impl AuditWriter {
    async fn run(self, mut rx: mpsc::Receiver<SinkMessage>) {
        while let Some(message) = rx.recv().await {
            let result = match message {
                SinkMessage::Audit(record) => self.write_audit(&record).await,
                SinkMessage::Attempt(record) => {
                    append(&self.attempt_path, record.to_line().as_bytes()).await
                }
                SinkMessage::Flush(done) => {
                    let _ = done.send(());
                    Ok(())
                }
            };

            if let Err(e) = result {
                self.failures.fetch_add(1, Ordering::Relaxed);
                metrics::record_audit_failure();
                tracing::error!(error = %e, "Failed to write log");
            }
        }
        tracing::debug!("Audit writer stopped");
    }

    async fn write_audit(&self, record: &RequestRecord) -> Result<(), AuditWriteError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');
        append(&self.audit_path, &line).await
    }
}

async fn append(path: &Path, bytes: &[u8]) -> Result<(), AuditWriteError> {
    let io_err = |source| AuditWriteError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(io_err)?;
    file.write_all(bytes).await.map_err(io_err)?;
    file.flush().await.map_err(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::record::AuditNote;
    use crate::http::request::InboundRequest;
    use axum::http::Request;

    fn inbound() -> InboundRequest {
        let request = Request::builder()
            .uri("/sys/hook/trigger-57829c4/")
            .header("x-api-key", "nope")
            .header("cookie", "session=abc")
            .body(())
            .unwrap();
        InboundRequest::from_request(&request, "127.0.0.1:9000".parse().unwrap(), false)
    }

    fn config(dir: &Path) -> AuditConfig {
        AuditConfig {
            audit_log_path: dir.join("audit.log"),
            attempt_log_path: dir.join("requests.log"),
            log_presented_tokens: true,
            ..AuditConfig::default()
        }
    }

    #[tokio::test]
    async fn test_writes_both_logs() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());
        let sink = AuditSink::spawn(&config);

        let request = inbound();
        sink.record(RequestRecord::from_inbound(&request, AuditNote::TriggerAccessed));
        sink.record_attempt(AttemptRecord::from_inbound(&request, true));
        sink.flush().await;

        let audit = std::fs::read_to_string(&config.audit_log_path).unwrap();
        let entry: RequestRecord = serde_json::from_str(audit.trim_end()).unwrap();
        assert_eq!(entry.request_id, request.id);
        assert_eq!(entry.headers["x-api-key"], "[REDACTED]");
        assert_eq!(entry.headers["cookie"], "[REDACTED]");
        assert!(!audit.contains("session=abc"));

        let attempts = std::fs::read_to_string(&config.attempt_log_path).unwrap();
        assert_eq!(attempts.lines().count(), 1);
        assert!(attempts.contains("Token: nope"));
        assert_eq!(sink.failures(), 0);
    }

    #[tokio::test]
    async fn test_appends_across_sinks() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path());

        for _ in 0..2 {
            let sink = AuditSink::spawn(&config);
            sink.record_attempt(AttemptRecord::from_inbound(&inbound(), true));
            sink.flush().await;
        }

        let attempts = std::fs::read_to_string(&config.attempt_log_path).unwrap();
        assert_eq!(attempts.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_write_failure_counted_not_propagated() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        // A directory cannot be opened for appending.
        config.audit_log_path = dir.path().to_path_buf();

        let sink = AuditSink::spawn(&config);
        let request = inbound();
        sink.record(RequestRecord::from_inbound(&request, AuditNote::UnhandledRoute));
        sink.record_attempt(AttemptRecord::from_inbound(&request, true));
        sink.flush().await;

        assert_eq!(sink.failures(), 1);
        let attempts = std::fs::read_to_string(&config.attempt_log_path).unwrap();
        assert_eq!(attempts.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_full_queue_drops_instead_of_waiting() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.queue_capacity = 2;

        // The writer cannot run until this task yields, so the queue fills.
        let sink = AuditSink::spawn(&config);
        let request = inbound();
        for _ in 0..5 {
            sink.record_attempt(AttemptRecord::from_inbound(&request, true));
        }
        assert_eq!(sink.failures(), 3);

        sink.flush().await;
        let attempts = std::fs::read_to_string(&config.attempt_log_path).unwrap();
        assert_eq!(attempts.lines().count(), 2);
        assert_eq!(sink.failures(), 3);
    }
}
