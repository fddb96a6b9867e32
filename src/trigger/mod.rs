//! Trigger subsystem.
//!
//! # Data Flow
//! ```text
//! InboundRequest
//!     → handler.rs (admission, audit, authorization, action)
//!     → disposition.rs (Drop(reason) | Respond(status, reply))
//!     → http layer (drop = connection torn down, respond = JSON body)
//! ```
//!
//! # Design Decisions
//! - Dropping is a terminal state, not an early return
//! - Every request is audited exactly once, whatever its outcome

pub mod disposition;
pub mod handler;

pub use disposition::{Disposition, DropReason, Reply, ReplyStatus};
pub use handler::TriggerHandler;
