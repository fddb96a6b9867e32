//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-IP admission, drop on denial)
//!     → [trigger handler audits the request]
//!     → auth.rs (constant-time secret check, drop on mismatch)
//!     → privileged action
//! ```
//!
//! # Design Decisions
//! - Fail closed: nothing observable is sent before authorization succeeds
//! - No trust in client input, including `X-Forwarded-For` unless configured

pub mod auth;
pub mod rate_limit;

pub use auth::{Authorizer, SecretToken, Verdict, API_KEY_HEADER};
pub use rate_limit::{Admission, RateLimiter};
