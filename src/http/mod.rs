//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TLS connection
//!     → server.rs (axum-server, Axum router)
//!     → fail_closed.rs (per-connection wrapper, peer address)
//!     → security::rate_limit (admission, builds request.rs context)
//!     → trigger handler or catch-all
//!     → fail_closed.rs (drop marker → connection torn down)
//! ```

pub mod fail_closed;
pub mod request;
pub mod server;

pub use fail_closed::{ConnectionDropped, DropConnection, FailClosed, MakeFailClosed};
pub use request::InboundRequest;
pub use server::{AppState, HttpServer};
