//! Trigger orchestration.
//!
//! ```text
//! RECEIVED ──admit()──▶ RATE_CHECKED ──audit──▶ AUDITED
//!    │ denied                                     │
//!    ▼                                            ├─ token mismatch ──▶ REJECTED ──▶ drop
//!   drop                                          └─ token match ──▶ AUTHORIZED (reset window)
//!                                                                       │
//!                                                       ACTION_DISPATCHED ──▶ 200 / 500 / 400
//! ```

use std::sync::Arc;

use crate::action::{ActionOutcome, CommandRunner, RebootAction};
use crate::audit::{AttemptRecord, AuditNote, AuditSink, RequestRecord};
use crate::config::TriggerConfig;
use crate::http::request::InboundRequest;
use crate::observability::metrics;
use crate::security::{Admission, Authorizer, RateLimiter, SecretToken, Verdict};
use crate::trigger::disposition::{Disposition, DropReason};

/// Owns every component a trigger request passes through.
#[derive(Debug)]
pub struct TriggerHandler {
    limiter: RateLimiter,
    authorizer: Authorizer,
    audit: AuditSink,
    action: RebootAction,
    log_presented_tokens: bool,
}

impl TriggerHandler {
    pub fn new(
        limiter: RateLimiter,
        authorizer: Authorizer,
        audit: AuditSink,
        action: RebootAction,
        log_presented_tokens: bool,
    ) -> Self {
        Self {
            limiter,
            authorizer,
            audit,
            action,
            log_presented_tokens,
        }
    }

    /// Wire up from a validated config.
    pub fn from_config(config: &TriggerConfig, audit: AuditSink, runner: Arc<dyn CommandRunner>) -> Self {
        let secret = config.auth.token.clone().unwrap_or_default();
        Self::new(
            RateLimiter::from_config(&config.rate_limit),
            Authorizer::new(SecretToken::new(secret)),
            audit,
            RebootAction::from_config(&config.action, runner),
            config.audit.log_presented_tokens,
        )
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn audit(&self) -> &AuditSink {
        &self.audit
    }

    pub fn action(&self) -> &RebootAction {
        &self.action
    }

    /// `RECEIVED → RATE_CHECKED`. Returns the terminal disposition on denial.
    pub fn admit(&self, request: &InboundRequest) -> Option<Disposition> {
        match self.limiter.admit(request.client_ip) {
            Admission::Admitted { remaining } => {
                tracing::trace!(request_id = %request.id, ip = %request.client_ip, remaining, "Admitted");
                None
            }
            Admission::Denied { retry_after } => {
                tracing::warn!(
                    request_id = %request.id,
                    ip = %request.client_ip,
                    retry_after_secs = retry_after.as_secs(),
                    "Rate limit exceeded"
                );
                metrics::record_rate_limited();
                self.audit
                    .record(RequestRecord::from_inbound(request, AuditNote::RateLimited));
                Some(self.finish(request, Disposition::Drop(DropReason::RateLimited)))
            }
        }
    }

    /// `RATE_CHECKED → … → terminal` for the trigger route.
    pub async fn trigger(&self, request: &InboundRequest) -> Disposition {
        self.audit
            .record(RequestRecord::from_inbound(request, AuditNote::TriggerAccessed));
        tracing::info!(request_id = %request.id, ip = %request.client_ip, "Incoming trigger request");
        self.audit
            .record_attempt(AttemptRecord::from_inbound(request, self.log_presented_tokens));

        if self.authorizer.verify(request.presented_token.as_deref()) == Verdict::Invalid {
            tracing::warn!(request_id = %request.id, ip = %request.client_ip, "Token invalid");
            return self.finish(request, Disposition::Drop(DropReason::InvalidCredential));
        }

        tracing::info!(request_id = %request.id, ip = %request.client_ip, "Token valid");
        self.limiter.reset(request.client_ip);

        // Detached so a client hanging up cannot cancel a reboot already under way.
        let action = self.action.clone();
        let outcome = match tokio::spawn(async move { action.dispatch().await }).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(request_id = %request.id, error = %e, "Action task failed");
                ActionOutcome::Failed {
                    message: "action task failed".to_string(),
                }
            }
        };

        self.finish(request, Disposition::from_outcome(outcome))
    }

    /// Any route other than the trigger: audit, then drop.
    pub fn unhandled(&self, request: &InboundRequest) -> Disposition {
        self.audit
            .record(RequestRecord::from_inbound(request, AuditNote::UnhandledRoute));
        self.finish(request, Disposition::Drop(DropReason::UnhandledRoute))
    }

    fn finish(&self, request: &InboundRequest, disposition: Disposition) -> Disposition {
        metrics::record_outcome(disposition.outcome_label());
        if disposition.is_drop() {
            tracing::debug!(
                request_id = %request.id,
                ip = %request.client_ip,
                outcome = disposition.outcome_label(),
                "Closing connection without response"
            );
        }
        disposition
    }
}
