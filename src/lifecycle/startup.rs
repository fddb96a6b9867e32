//! Startup orchestration.
//!
//! # Responsibilities
//! - Surface risky configuration loudly before serving
//! - Initialize subsystems in dependency order
//! - Bind the listener last and serve until a shutdown signal
//! - Flush the audit logs before returning

use std::sync::Arc;

use thiserror::Error;

use crate::action::SystemRunner;
use crate::audit::AuditSink;
use crate::config::LoadedConfig;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::net::{listener, load_tls_config, ListenerError, TlsError};
use crate::observability::metrics;
use crate::trigger::TriggerHandler;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Tls(#[from] TlsError),

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Run the service until SIGINT/SIGTERM.
pub async fn run(loaded: LoadedConfig) -> Result<(), StartupError> {
    let config = loaded.config;

    if loaded.insecure_default_token {
        tracing::warn!(
            "!!! No TOKEN supplied: using the built-in default secret. \
             Anyone who has read the source can reboot this host. Set TOKEN. !!!"
        );
    }
    if config.audit.log_presented_tokens {
        tracing::warn!(
            path = ?config.audit.attempt_log_path,
            "Presented tokens are logged verbatim; a near-miss of the real secret will land on disk"
        );
    }
    if config.listener.trust_forwarded_for {
        tracing::warn!("Trusting X-Forwarded-For for client addresses");
    }

    if let Some(addr) = &config.observability.metrics_address {
        match addr.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(metrics_address = %addr, error = %e, "Failed to parse metrics address"),
        }
    }

    let tls = load_tls_config(&config.tls.cert_path, &config.tls.key_path).await?;

    let audit = AuditSink::spawn(&config.audit);
    let handler = TriggerHandler::from_config(&config, audit.clone(), Arc::new(SystemRunner));
    match handler.action().command() {
        Some(command) => tracing::info!(
            platform = %handler.action().platform(),
            command = %command,
            "Reboot command selected"
        ),
        None => tracing::warn!(
            platform = %handler.action().platform(),
            "No reboot command for this platform; authorized triggers will get 400"
        ),
    }

    let listener = listener::bind(&config.listener)?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        shutdown.trigger();
    });

    HttpServer::new(Arc::new(handler), &config)
        .run(listener, Some(tls), server_shutdown)
        .await?;

    audit.flush().await;
    tracing::info!(failed_writes = audit.failures(), "Audit logs flushed");
    Ok(())
}
