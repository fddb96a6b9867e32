//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the trigger route and the catch-all
//! - Wire up middleware (tracing, per-IP admission)
//! - Serve over TLS (or plaintext for tests) via axum-server
//! - Drain connections on shutdown

use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    middleware,
    routing::get,
    Extension, Router,
};
use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::TriggerConfig;
use crate::http::fail_closed::MakeFailClosed;
use crate::http::request::InboundRequest;
use crate::security::rate_limit::rate_limit_middleware;
use crate::trigger::{Disposition, DropReason, TriggerHandler};

/// How long in-flight requests get to finish after shutdown is signalled.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub handler: Arc<TriggerHandler>,
    pub trust_forwarded_for: bool,
}

/// HTTPS server exposing the trigger endpoint.
pub struct HttpServer {
    router: Router,
    trigger_path: String,
}

impl HttpServer {
    /// Create a new HTTP server around a fully wired handler.
    pub fn new(handler: Arc<TriggerHandler>, config: &TriggerConfig) -> Self {
        let state = AppState {
            handler,
            trust_forwarded_for: config.listener.trust_forwarded_for,
        };
        let trigger_path = config.route.trigger_path.clone();
        let router = Self::build_router(&trigger_path, state);
        Self {
            router,
            trigger_path,
        }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Admission runs for every path, including the catch-all.
    fn build_router(trigger_path: &str, state: AppState) -> Router {
        Router::new()
            .route(trigger_path, get(trigger_handler).fallback(unhandled_handler))
            .fallback(unhandled_handler)
            .layer(middleware::from_fn_with_state(state.clone(), rate_limit_middleware))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Serve on `listener` until `shutdown` fires. `tls = None` serves plaintext.
    pub async fn run(
        self,
        listener: TcpListener,
        tls: Option<RustlsConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        listener.set_nonblocking(true)?;

        let handle = Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            let _ = shutdown.recv().await;
            tracing::info!(timeout_secs = DRAIN_TIMEOUT.as_secs(), "Draining connections");
            drain.graceful_shutdown(Some(DRAIN_TIMEOUT));
        });

        let service = MakeFailClosed::new(self.router);

        match tls {
            Some(tls) => {
                tracing::info!(address = %addr, path = %self.trigger_path, "HTTPS server running");
                axum_server::tls_rustls::from_tcp_rustls(listener, tls)
                    .handle(handle)
                    .serve(service)
                    .await?;
            }
            None => {
                tracing::warn!(address = %addr, path = %self.trigger_path, "Serving WITHOUT TLS");
                axum_server::from_tcp(listener)
                    .handle(handle)
                    .serve(service)
                    .await?;
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn trigger_handler(
    State(state): State<AppState>,
    request: Option<Extension<InboundRequest>>,
) -> Disposition {
    match request {
        Some(Extension(request)) => state.handler.trigger(&request).await,
        None => missing_context(),
    }
}

async fn unhandled_handler(
    State(state): State<AppState>,
    request: Option<Extension<InboundRequest>>,
) -> Disposition {
    match request {
        Some(Extension(request)) => state.handler.unhandled(&request),
        None => missing_context(),
    }
}

fn missing_context() -> Disposition {
    tracing::error!("Request reached a handler without admission context");
    Disposition::Drop(DropReason::UnhandledRoute)
}
