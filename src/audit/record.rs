//! Audit and attempt record types.

use std::collections::BTreeMap;
use std::net::IpAddr;

use axum::http::HeaderMap;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::http::request::InboundRequest;

/// Replacement value for sensitive headers and withheld tokens.
pub const REDACTED: &str = "[REDACTED]";

/// Attempt-log placeholder when no `x-api-key` header was sent.
pub const NO_TOKEN: &str = "<none>";

/// Header keys whose values never reach disk.
pub const SENSITIVE_HEADERS: [&str; 4] = ["authorization", "x-api-key", "cookie", "set-cookie"];

/// Why a request was audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditNote {
    TriggerAccessed,
    UnhandledRoute,
    RateLimited,
}

impl AuditNote {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditNote::TriggerAccessed => "Reboot endpoint accessed",
            AuditNote::UnhandledRoute => "Unhandled route accessed",
            AuditNote::RateLimited => "Rate limit exceeded",
        }
    }
}

impl std::fmt::Display for AuditNote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One redacted entry of the verbose audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestRecord {
    pub request_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub source_ip: IpAddr,
    pub method: String,
    pub path: String,
    pub user_agent: String,
    pub query: BTreeMap<String, String>,
    pub headers: BTreeMap<String, String>,
    pub note: String,
}

impl RequestRecord {
    pub fn from_inbound(request: &InboundRequest, note: AuditNote) -> Self {
        Self {
            request_id: request.id,
            timestamp: Utc::now(),
            source_ip: request.client_ip,
            method: request.method.to_string(),
            path: request.path.clone(),
            user_agent: request
                .user_agent
                .clone()
                .unwrap_or_else(|| "Unknown".to_string()),
            query: request.query.clone(),
            headers: redact_headers(&request.headers),
            note: note.as_str().to_string(),
        }
    }
}

/// One line of the minimal attempt log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptRecord {
    pub request_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub token: Option<String>,
    pub source_ip: IpAddr,
}

impl AttemptRecord {
    /// `log_token = false` replaces any presented token with [`REDACTED`].
    pub fn from_inbound(request: &InboundRequest, log_token: bool) -> Self {
        let token = match (&request.presented_token, log_token) {
            (Some(token), true) => Some(token.clone()),
            (Some(_), false) => Some(REDACTED.to_string()),
            (None, _) => None,
        };

        Self {
            request_id: request.id,
            timestamp: Utc::now(),
            token,
            source_ip: request.client_ip,
        }
    }

    pub fn to_line(&self) -> String {
        format!(
            "{} - Token: {} - IP: {} - Request: {}\n",
            self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.token.as_deref().unwrap_or(NO_TOKEN),
            self.source_ip,
            self.request_id,
        )
    }
}

/// Flatten headers into a map with sensitive values replaced.
///
/// Repeated headers are joined with `", "`.
pub fn redact_headers(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut redacted: BTreeMap<String, String> = BTreeMap::new();

    for (name, value) in headers {
        let key = name.as_str().to_ascii_lowercase();
        let sensitive = SENSITIVE_HEADERS.iter().any(|s| s.eq_ignore_ascii_case(&key));
        let value = if sensitive {
            REDACTED.to_string()
        } else {
            String::from_utf8_lossy(value.as_bytes()).into_owned()
        };

        redacted
            .entry(key)
            .and_modify(|existing| {
                if existing != REDACTED {
                    existing.push_str(", ");
                    existing.push_str(&value);
                }
            })
            .or_insert(value);
    }

    redacted
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderName, HeaderValue, Method, Request};

    fn inbound(headers: &[(&str, &str)]) -> InboundRequest {
        let mut builder = Request::builder().method(Method::GET).uri("/wp-login.php?a=1");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder.body(()).unwrap();
        InboundRequest::from_request(&request, "198.51.100.7:5555".parse().unwrap(), false)
    }

    #[test]
    fn test_redacts_sensitive_headers_any_case() {
        let mut headers = HeaderMap::new();
        for name in ["Authorization", "X-API-KEY", "Cookie", "SET-COOKIE"] {
            headers.append(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_static("secret-value"),
            );
        }
        headers.append("accept", HeaderValue::from_static("*/*"));

        let redacted = redact_headers(&headers);
        for key in SENSITIVE_HEADERS {
            assert_eq!(redacted.get(key).map(String::as_str), Some(REDACTED), "{key}");
        }
        assert_eq!(redacted.get("accept").map(String::as_str), Some("*/*"));
        assert!(!format!("{redacted:?}").contains("secret-value"));
    }

    #[test]
    fn test_repeated_headers_joined() {
        let mut headers = HeaderMap::new();
        headers.append("accept-language", HeaderValue::from_static("en"));
        headers.append("accept-language", HeaderValue::from_static("de"));
        headers.append("cookie", HeaderValue::from_static("a=1"));
        headers.append("cookie", HeaderValue::from_static("b=2"));

        let redacted = redact_headers(&headers);
        assert_eq!(redacted["accept-language"], "en, de");
        assert_eq!(redacted["cookie"], REDACTED);
    }

    #[test]
    fn test_request_record_defaults_user_agent() {
        let record = RequestRecord::from_inbound(&inbound(&[]), AuditNote::UnhandledRoute);
        assert_eq!(record.user_agent, "Unknown");
        assert_eq!(record.note, "Unhandled route accessed");
        assert_eq!(record.path, "/wp-login.php");
        assert_eq!(record.query["a"], "1");
    }

    #[test]
    fn test_attempt_line_with_token() {
        let record = AttemptRecord::from_inbound(&inbound(&[("x-api-key", "guess")]), true);
        let line = record.to_line();
        assert!(line.contains(" - Token: guess - IP: 198.51.100.7 - Request: "));
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn test_attempt_line_token_withheld() {
        let record = AttemptRecord::from_inbound(&inbound(&[("x-api-key", "guess")]), false);
        assert_eq!(record.token.as_deref(), Some(REDACTED));

        let missing = AttemptRecord::from_inbound(&inbound(&[]), true);
        assert!(missing.to_line().contains("Token: <none> - IP: "));
    }
}
