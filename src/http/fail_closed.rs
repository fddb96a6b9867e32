//! Connection teardown for unauthorized callers.
//!
//! Axum handlers always produce a response. To send nothing at all, a handler
//! returns a response tagged with [`DropConnection`]; the [`FailClosed`]
//! wrapper sitting between hyper and the router turns that into a service
//! error. Hyper then closes the connection (HTTP/1) or resets the stream
//! (HTTP/2) without writing a status line, so the caller cannot tell the drop
//! apart from a network failure.

use std::convert::Infallible;
use std::future::{ready, Ready};
use std::net::SocketAddr;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, Response},
    Router,
};
use futures_util::future::BoxFuture;
use thiserror::Error;
use tower::Service;

/// Response extension marking "tear down, do not answer".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DropConnection;

/// An empty response carrying the [`DropConnection`] marker.
pub fn drop_connection() -> Response<Body> {
    let mut response = Response::new(Body::empty());
    response.extensions_mut().insert(DropConnection);
    response
}

/// Service error that makes hyper abandon the connection.
#[derive(Debug, Clone, Copy, Error)]
#[error("connection dropped without response")]
pub struct ConnectionDropped;

/// Per-connection wrapper around the router.
///
/// Also injects the peer address as [`ConnectInfo`] for extractors.
#[derive(Debug, Clone)]
pub struct FailClosed<S> {
    inner: S,
    peer: SocketAddr,
}

impl<S> FailClosed<S> {
    pub fn new(inner: S, peer: SocketAddr) -> Self {
        Self { inner, peer }
    }
}

impl<S, B> Service<Request<B>> for FailClosed<S>
where
    S: Service<Request<B>, Response = Response<Body>, Error = Infallible>,
    S::Future: Send + 'static,
{
    type Response = Response<Body>;
    type Error = ConnectionDropped;
    type Future = BoxFuture<'static, Result<Response<Body>, ConnectionDropped>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(|never| match never {})
    }

    fn call(&mut self, mut request: Request<B>) -> Self::Future {
        request.extensions_mut().insert(ConnectInfo(self.peer));
        let future = self.inner.call(request);

        Box::pin(async move {
            let response = match future.await {
                Ok(response) => response,
                Err(never) => match never {},
            };

            if response.extensions().get::<DropConnection>().is_some() {
                Err(ConnectionDropped)
            } else {
                Ok(response)
            }
        })
    }
}

/// Make-service handing each accepted connection its own [`FailClosed`] router.
#[derive(Debug, Clone)]
pub struct MakeFailClosed {
    router: Router,
}

impl MakeFailClosed {
    pub fn new(router: Router) -> Self {
        Self { router }
    }
}

impl Service<SocketAddr> for MakeFailClosed {
    type Response = FailClosed<Router>;
    type Error = Infallible;
    type Future = Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, peer: SocketAddr) -> Self::Future {
        ready(Ok(FailClosed::new(self.router.clone(), peer)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::get};
    use tower::ServiceExt;

    fn router() -> Router {
        Router::new()
            .route("/drop", get(|| async { drop_connection() }))
            .route(
                "/peer",
                get(|ConnectInfo(peer): ConnectInfo<SocketAddr>| async move { peer.to_string() }),
            )
    }

    fn peer() -> SocketAddr {
        "192.0.2.1:1234".parse().unwrap()
    }

    #[tokio::test]
    async fn test_marked_response_becomes_error() {
        let service = FailClosed::new(router(), peer());
        let request = Request::builder().uri("/drop").body(Body::empty()).unwrap();
        assert!(service.oneshot(request).await.is_err());
    }

    #[tokio::test]
    async fn test_plain_response_passes_through_with_peer() {
        let service = FailClosed::new(router(), peer());
        let request = Request::builder().uri("/peer").body(Body::empty()).unwrap();
        let response = service.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&body[..], b"192.0.2.1:1234");
    }
}
