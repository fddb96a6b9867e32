//! Terminal states of the trigger flow.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::action::ActionOutcome;
use crate::http::fail_closed::drop_connection;

/// Why a connection was torn down without a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    RateLimited,
    InvalidCredential,
    UnhandledRoute,
}

impl DropReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropReason::RateLimited => "dropped_rate_limited",
            DropReason::InvalidCredential => "dropped_invalid_credential",
            DropReason::UnhandledRoute => "dropped_unhandled_route",
        }
    }
}

/// `status` field of a reply body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Success,
    Error,
}

/// JSON body sent to authorized callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub status: ReplyStatus,
    pub message: String,
}

impl Reply {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ReplyStatus::Error,
            message: message.into(),
        }
    }
}

/// How a request ends: silently dropped, or answered.
///
/// Only requests that proved the secret ever reach `Respond`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    Drop(DropReason),
    Respond { status: StatusCode, reply: Reply },
}

impl Disposition {
    pub fn from_outcome(outcome: ActionOutcome) -> Self {
        let (status, reply) = match outcome {
            ActionOutcome::Succeeded { .. } => (StatusCode::OK, Reply::success("Rebooting the system")),
            ActionOutcome::Failed { message } => (StatusCode::INTERNAL_SERVER_ERROR, Reply::error(message)),
            ActionOutcome::Unsupported { .. } => (StatusCode::BAD_REQUEST, Reply::error("Unsupported OS")),
        };
        Disposition::Respond { status, reply }
    }

    pub fn is_drop(&self) -> bool {
        matches!(self, Disposition::Drop(_))
    }

    /// Label for the `trigger_requests_total` counter.
    pub fn outcome_label(&self) -> &'static str {
        match self {
            Disposition::Drop(reason) => reason.as_str(),
            Disposition::Respond { status, .. } if status.is_success() => "success",
            Disposition::Respond { status, .. } if *status == StatusCode::BAD_REQUEST => "unsupported",
            Disposition::Respond { .. } => "failed",
        }
    }
}

impl IntoResponse for Disposition {
    fn into_response(self) -> Response {
        match self {
            Disposition::Drop(_) => drop_connection(),
            Disposition::Respond { status, reply } => (status, Json(reply)).into_response(),
        }
    }
}
