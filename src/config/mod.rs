//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (PORT / TOKEN environment overrides)
//!     → validation.rs (semantic checks)
//!     → TriggerConfig (validated, immutable)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow running from the environment alone
//! - A missing secret is a validation error, not a silent fallback

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, LoadedConfig, INSECURE_DEFAULT_TOKEN};
pub use schema::{
    ActionConfig, AuditConfig, AuthConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    RateLimitConfig, RouteConfig, TlsConfig, TriggerConfig, DEFAULT_AUDIT_QUEUE_CAPACITY,
    DEFAULT_TRIGGER_PATH,
};
pub use validation::ValidationError;
