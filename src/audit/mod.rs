//! Audit logging subsystem.
//!
//! # Data Flow
//! ```text
//! Trigger handler
//!     → record.rs (build RequestRecord / AttemptRecord, redact headers)
//!     → sink.rs (enqueue, never blocks the response)
//!     → writer task → audit.log (JSON lines) / requests.log (text lines)
//!                   → on failure: tracing::error! + counter
//! ```

pub mod record;
pub mod sink;

pub use record::{AttemptRecord, AuditNote, RequestRecord, NO_TOKEN, REDACTED, SENSITIVE_HEADERS};
pub use sink::{AuditSink, AuditWriteError};
