//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (bound socket)
//!     → tls.rs (rustls handshake via axum-server)
//!     → Hand off to HTTP layer
//! ```
//!
//! # Design Decisions
//! - TLS material is validated before the listener is bound
//! - Certificate provisioning is external; we only read PEM files

pub mod listener;
pub mod tls;

pub use listener::ListenerError;
pub use tls::{load_tls_config, TlsError};
