//! Privileged action subsystem.
//!
//! # Data Flow
//! ```text
//! Authorized trigger
//!     → platform.rs (detect OS, pick reboot command or config override)
//!     → runner.rs (spawn via tokio::process, bounded by timeout)
//!     → ActionOutcome (succeeded / failed / unsupported)
//! ```
//!
//! # Design Decisions
//! - Commands are argv vectors, never shell strings
//! - Any stderr output counts as failure
//! - A hung command is killed when its timeout elapses

pub mod platform;
pub mod runner;

pub use platform::{Platform, RebootCommand};
pub use runner::{ActionError, ActionOutcome, CommandOutput, CommandRunner, RebootAction, SystemRunner};
