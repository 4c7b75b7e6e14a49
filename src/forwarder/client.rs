//! Outbound forwarding.
//!
//! # Responsibilities
//! - POST the admitted payload, byte for byte, to the rule's destination
//! - Bound every forward with a timeout
//! - Classify the outcome (forwarded, unreachable, timed out)
//!
//! # Design Decisions
//! - No retries: a failed forward is reported once (at-most-once)
//! - Any HTTP response counts as accepted; only transport failures fail

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::body::{Body, Bytes};
use axum::http::{header, Method, Request, StatusCode};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use thiserror::Error;

use crate::observability::metrics;

/// Errors raised while forwarding.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The destination refused or dropped the connection.
    #[error("could not connect to {target}: {source}")]
    UnreachableDestination {
        target: SocketAddr,
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    /// The destination did not answer within the forward timeout.
    #[error("forward to {target} timed out after {after:?}")]
    Timeout { target: SocketAddr, after: Duration },

    /// The outbound request could not be built.
    #[error("could not build request for {target}: {source}")]
    Request {
        target: SocketAddr,
        #[source]
        source: axum::http::Error,
    },
}

/// A completed forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Forwarded {
    pub target: SocketAddr,
    /// Status returned by the destination.
    pub status: StatusCode,
}

/// HTTP client for forwarding admitted payloads.
#[derive(Clone)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
    timeout: Duration,
}

impl Forwarder {
    /// Create a forwarder whose calls give up after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(timeout));
        let client = Client::builder(TokioExecutor::new()).build(connector);
        Self { client, timeout }
    }

    /// POST `body` to `http://target/`.
    pub async fn forward(&self, target: SocketAddr, body: Bytes) -> Result<Forwarded, ForwardError> {
        let start = Instant::now();
        let request = Request::builder()
            .method(Method::POST)
            .uri(format!("http://{}/", target))
            .header(header::CONTENT_LENGTH, body.len())
            .body(Body::from(body))
            .map_err(|source| ForwardError::Request { target, source })?;

        let result = match tokio::time::timeout(self.timeout, self.client.request(request)).await {
            Ok(Ok(response)) => Ok(Forwarded {
                target,
                status: response.status(),
            }),
            Ok(Err(source)) => Err(ForwardError::UnreachableDestination { target, source }),
            Err(_) => Err(ForwardError::Timeout {
                target,
                after: self.timeout,
            }),
        };

        metrics::record_forward(result.is_ok(), start);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_forward_delivers_exact_body() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                received.extend_from_slice(&buf[..n]);
                if n == 0 || received.ends_with(b"\x00frame\xff") {
                    break;
                }
            }
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                .await
                .unwrap();
            received
        });

        let forwarder = Forwarder::new(Duration::from_secs(5));
        let outcome = forwarder
            .forward(target, Bytes::from_static(b"\x00frame\xff"))
            .await
            .unwrap();
        assert_eq!(outcome.status, StatusCode::OK);

        let received = server.await.unwrap();
        let text = String::from_utf8_lossy(&received);
        assert!(text.starts_with("POST / HTTP/1.1"));
        assert!(received.ends_with(b"\x00frame\xff"));
    }

    #[tokio::test]
    async fn test_refused_connection_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = listener.local_addr().unwrap();
        drop(listener);

        let forwarder = Forwarder::new(Duration::from_secs(5));
        let err = forwarder.forward(target, Bytes::new()).await.unwrap_err();
        assert!(matches!(err, ForwardError::UnreachableDestination { .. }));
    }

    #[tokio::test]
    async fn test_silent_destination_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target = listener.local_addr().unwrap();
        let hold = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(2)).await;
            drop(socket);
        });

        let forwarder = Forwarder::new(Duration::from_millis(200));
        let err = forwarder.forward(target, Bytes::from_static(b"x")).await.unwrap_err();
        assert!(matches!(err, ForwardError::Timeout { .. }));
        hold.abort();
    }
}
