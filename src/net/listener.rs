//! TCP listener setup.
//!
//! # Responsibilities
//! - Resolve and bind the configured address
//! - Hand a non-blocking socket to the HTTP server

use std::net::{SocketAddr, TcpListener, ToSocketAddrs};

use crate::config::ListenerConfig;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Address did not resolve.
    Resolve(String, std::io::Error),
    /// Failed to bind to address.
    Bind(SocketAddr, std::io::Error),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Resolve(addr, e) => write!(f, "Failed to resolve {}: {}", addr, e),
            ListenerError::Bind(addr, e) => write!(f, "Failed to bind {}: {}", addr, e),
        }
    }
}

impl std::error::Error for ListenerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ListenerError::Resolve(_, e) | ListenerError::Bind(_, e) => Some(e),
        }
    }
}

/// Bind the configured address. The returned socket is non-blocking.
pub fn bind(config: &ListenerConfig) -> Result<TcpListener, ListenerError> {
    let address = config.bind_address();
    let addrs: Vec<SocketAddr> = address
        .to_socket_addrs()
        .map_err(|e| ListenerError::Resolve(address.clone(), e))?
        .collect();

    let mut last_error = None;
    for addr in addrs {
        match TcpListener::bind(addr).and_then(|l| l.set_nonblocking(true).map(|_| l)) {
            Ok(listener) => {
                tracing::info!(address = %addr, "Listener bound");
                return Ok(listener);
            }
            Err(e) => last_error = Some(ListenerError::Bind(addr, e)),
        }
    }

    Err(last_error.unwrap_or_else(|| {
        ListenerError::Resolve(
            address,
            std::io::Error::new(std::io::ErrorKind::NotFound, "no addresses"),
        )
    }))
}
