//! Per-IP admission control.
//!
//! Each source IP gets a counter that lives for one fixed window starting at
//! its first request. Requests past `max_requests` in the window are denied
//! and the connection is dropped by the caller.
//!
//! Expired windows are swept at most once per window, and only once the
//! table is large. A full table admits no new IPs until the next sweep frees
//! room; IPs already tracked keep their normal budget.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::RateLimitConfig;
use crate::http::request::InboundRequest;
use crate::http::server::AppState;

/// Map size past which expired windows are swept on the next admission.
const PRUNE_THRESHOLD: usize = 4096;

/// Hard cap on tracked IPs.
const MAX_TRACKED: usize = 1 << 20;

/// Counter state for one source IP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindowEntry {
    pub window_start: Instant,
    pub count: u32,
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Request may proceed; `remaining` more fit in the current window.
    Admitted { remaining: u32 },
    /// Window exhausted; it rolls over after `retry_after`.
    Denied { retry_after: Duration },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted { .. })
    }
}

#[derive(Debug, Default)]
struct WindowTable {
    entries: HashMap<IpAddr, RateWindowEntry>,
    last_sweep: Option<Instant>,
    sweeps: u64,
}

impl WindowTable {
    fn sweep_due(&self, now: Instant, window: Duration, threshold: usize) -> bool {
        self.entries.len() >= threshold
            && self
                .last_sweep
                .map_or(true, |last| now.saturating_duration_since(last) >= window)
    }

    fn sweep(&mut self, now: Instant, window: Duration) {
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| now.saturating_duration_since(entry.window_start) < window);
        self.last_sweep = Some(now);
        self.sweeps += 1;
        tracing::debug!(before, after = self.entries.len(), sweeps = self.sweeps, "Swept expired rate windows");
    }
}

/// Fixed-window request counter keyed by source IP.
#[derive(Debug)]
pub struct RateLimiter {
    table: Mutex<WindowTable>,
    window: Duration,
    max_requests: u32,
    max_tracked: usize,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            table: Mutex::new(WindowTable::default()),
            window,
            max_requests,
            max_tracked: MAX_TRACKED,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(Duration::from_secs(config.window_secs), config.max_requests)
    }

    #[cfg(test)]
    fn with_max_tracked(mut self, max_tracked: usize) -> Self {
        self.max_tracked = max_tracked;
        self
    }

    #[cfg(test)]
    fn sweeps(&self) -> u64 {
        self.lock().sweeps
    }

    /// Count a request from `ip` and decide whether it is admitted.
    pub fn admit(&self, ip: IpAddr) -> Admission {
        self.admit_at(ip, Instant::now())
    }

    pub(crate) fn admit_at(&self, ip: IpAddr, now: Instant) -> Admission {
        let mut table = self.lock();

        if table.sweep_due(now, self.window, PRUNE_THRESHOLD.min(self.max_tracked)) {
            table.sweep(now, self.window);
        }

        if table.entries.len() >= self.max_tracked && !table.entries.contains_key(&ip) {
            let next_sweep = table
                .last_sweep
                .map_or(Duration::ZERO, |last| {
                    self.window.saturating_sub(now.saturating_duration_since(last))
                });
            return Admission::Denied {
                retry_after: next_sweep,
            };
        }

        let entry = table.entries.entry(ip).or_insert(RateWindowEntry {
            window_start: now,
            count: 0,
        });

        let elapsed = now.saturating_duration_since(entry.window_start);
        if elapsed >= self.window {
            entry.window_start = now;
            entry.count = 0;
        }

        entry.count = entry.count.saturating_add(1);

        if entry.count > self.max_requests {
            Admission::Denied {
                retry_after: self
                    .window
                    .saturating_sub(now.saturating_duration_since(entry.window_start)),
            }
        } else {
            Admission::Admitted {
                remaining: self.max_requests - entry.count,
            }
        }
    }

    /// Forget the counter for `ip`.
    pub fn reset(&self, ip: IpAddr) {
        self.lock().entries.remove(&ip);
    }

    /// Requests counted for `ip` in its live window.
    pub fn count(&self, ip: IpAddr) -> u32 {
        self.count_at(ip, Instant::now())
    }

    pub(crate) fn count_at(&self, ip: IpAddr, now: Instant) -> u32 {
        self.lock()
            .entries
            .get(&ip)
            .filter(|entry| now.saturating_duration_since(entry.window_start) < self.window)
            .map_or(0, |entry| entry.count)
    }

    /// Number of IPs currently tracked.
    pub fn tracked(&self) -> usize {
        self.lock().entries.len()
    }

    // Counter updates are single statements, so a poisoned map is still consistent.
    fn lock(&self) -> MutexGuard<'_, WindowTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Router-wide admission middleware.
///
/// Resolves the client address once, runs the admission check, and hands the
/// parsed [`InboundRequest`] to the handlers through request extensions.
pub async fn rate_limit_middleware(
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let inbound = InboundRequest::from_request(&request, peer, state.trust_forwarded_for);

    if let Some(denied) = state.handler.admit(&inbound) {
        return denied.into_response();
    }

    request.extensions_mut().insert(inbound);
    next.run(request).await
}
