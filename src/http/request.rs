//! Request context extraction.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) for correlating log entries
//! - Resolve the client IP (peer address or trusted `X-Forwarded-For`)
//! - Capture everything the audit log needs before the handler runs
//!
//! # Design Decisions
//! - Built once in the admission middleware and passed via extensions
//! - Header values are captured raw; redaction happens in the audit layer

use std::collections::BTreeMap;
use std::net::{IpAddr, SocketAddr};

use axum::http::{header, HeaderMap, Method, Request};
use uuid::Uuid;

use crate::security::auth::API_KEY_HEADER;

/// Everything known about one inbound request.
#[derive(Debug, Clone)]
pub struct InboundRequest {
    pub id: Uuid,
    pub peer: SocketAddr,
    pub client_ip: IpAddr,
    pub method: Method,
    pub path: String,
    pub query: BTreeMap<String, String>,
    pub user_agent: Option<String>,
    pub headers: HeaderMap,
    /// Value of the `x-api-key` header, when present and valid UTF-8.
    pub presented_token: Option<String>,
}

impl InboundRequest {
    pub fn from_request<B>(request: &Request<B>, peer: SocketAddr, trust_forwarded_for: bool) -> Self {
        let headers = request.headers().clone();
        let client_ip = if trust_forwarded_for {
            forwarded_client_ip(&headers).unwrap_or_else(|| peer.ip())
        } else {
            peer.ip()
        };

        let query = request
            .uri()
            .query()
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default();

        let user_agent = headers
            .get(header::USER_AGENT)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());

        let presented_token = headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        Self {
            id: Uuid::new_v4(),
            peer,
            client_ip,
            method: request.method().clone(),
            path: request.uri().path().to_string(),
            query,
            user_agent,
            headers,
            presented_token,
        }
    }
}

/// First parseable address in `X-Forwarded-For`.
fn forwarded_client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .find_map(|candidate| candidate.trim().parse().ok())
}
