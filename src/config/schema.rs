//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the trigger
//! service. All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Path of the single trigger endpoint.
pub const DEFAULT_TRIGGER_PATH: &str = "/sys/hook/trigger-57829c4/";

/// Default HTTPS port.
pub const DEFAULT_PORT: u16 = 51822;

/// Pending audit entries before new ones are dropped.
pub const DEFAULT_AUDIT_QUEUE_CAPACITY: usize = 8192;

/// Root configuration for the trigger service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TriggerConfig {
    /// Listener configuration (bind address, port).
    pub listener: ListenerConfig,

    /// TLS certificate and key locations.
    pub tls: TlsConfig,

    /// Route of the trigger endpoint.
    pub route: RouteConfig,

    /// Shared secret settings.
    pub auth: AuthConfig,

    /// Per-IP admission limits.
    pub rate_limit: RateLimitConfig,

    /// Audit and attempt log settings.
    pub audit: AuditConfig,

    /// Privileged action settings.
    pub action: ActionConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Host or IP to bind (e.g., "0.0.0.0").
    pub bind_host: String,

    /// Listen port. Overridden by `PORT`.
    pub port: u16,

    /// Resolve the client address from `X-Forwarded-For`.
    ///
    /// Only enable behind a reverse proxy that sets the header itself,
    /// otherwise clients can pick their own rate-limit key.
    pub trust_forwarded_for: bool,
}

impl ListenerConfig {
    /// `host:port` string suitable for binding.
    pub fn bind_address(&self) -> String {
        if self.bind_host.contains(':') {
            format!("[{}]:{}", self.bind_host, self.port)
        } else {
            format!("{}:{}", self.bind_host, self.port)
        }
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            trust_forwarded_for: false,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: PathBuf,

    /// Path to private key file (PEM).
    pub key_path: PathBuf,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            cert_path: PathBuf::from("ssl/cert.pem"),
            key_path: PathBuf::from("ssl/key.pem"),
        }
    }
}

/// Trigger route configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RouteConfig {
    /// Exact path of the trigger endpoint.
    pub trigger_path: String,
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            trigger_path: DEFAULT_TRIGGER_PATH.to_string(),
        }
    }
}

/// Shared secret configuration.
#[derive(Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// The shared secret. Overridden by `TOKEN`.
    pub token: Option<String>,

    /// Fall back to the built-in default secret when none is supplied.
    pub allow_insecure_default: bool,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("allow_insecure_default", &self.allow_insecure_default)
            .finish()
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Window length in seconds.
    pub window_secs: u64,

    /// Requests admitted per IP within one window.
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_secs: 15 * 60,
            max_requests: 10,
        }
    }
}

/// Audit logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Verbose, redacted request log.
    pub audit_log_path: PathBuf,

    /// Minimal per-attempt log (timestamp, token, IP).
    pub attempt_log_path: PathBuf,

    /// Write the presented token verbatim into the attempt log.
    pub log_presented_tokens: bool,

    /// Entries that may wait for the writer. Overflow is dropped and counted
    /// as a write failure.
    pub queue_capacity: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            audit_log_path: PathBuf::from("audit.log"),
            attempt_log_path: PathBuf::from("requests.log"),
            log_presented_tokens: true,
            queue_capacity: DEFAULT_AUDIT_QUEUE_CAPACITY,
        }
    }
}

/// Privileged action configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ActionConfig {
    /// Upper bound on the reboot command's runtime.
    pub timeout_secs: u64,

    /// Replaces the per-platform reboot command (program followed by args).
    pub command: Option<Vec<String>>,
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            command: None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Filter directives used when `RUST_LOG` is unset.
    pub log_filter: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Prometheus exporter address. Disabled when unset.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "reboot_trigger=info,tower_http=info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_address: None,
        }
    }
}
