//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};

use forward_filter::{DelayLedger, FilterConfig, FilterServer, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Payloads received by a mock destination, in arrival order.
pub type Received = Arc<Mutex<Vec<Vec<u8>>>>;

/// Start a mock destination that answers 200 and records request bodies.
pub async fn start_mock_destination() -> (SocketAddr, Received) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let received: Received = Arc::new(Mutex::new(Vec::new()));

    let sink = received.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    let sink = sink.clone();
                    tokio::spawn(serve_one(socket, sink));
                }
                Err(_) => break,
            }
        }
    });

    (addr, received)
}

async fn serve_one(mut socket: TcpStream, sink: Received) {
    let Some(body) = read_request_body(&mut socket).await else {
        return;
    };
    sink.lock().unwrap().push(body);

    let response = "HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok";
    let _ = socket.write_all(response.as_bytes()).await;
    let _ = socket.shutdown().await;
}

async fn read_request_body(socket: &mut TcpStream) -> Option<Vec<u8>> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_ascii_lowercase();
    let length: usize = head
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(0);

    while buf.len() < header_end + length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Some(buf[header_end..].to_vec())
}

/// A port nothing listens on.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

/// Start the filter with `rules` and a ledger at `ledger_path`.
pub async fn start_filter(rules: &str, ledger_path: &Path, shutdown: &Shutdown) -> SocketAddr {
    let table = forward_filter::rules::parse_rules(rules, "integration").unwrap();
    let ledger = DelayLedger::open(ledger_path).unwrap();

    let mut config = FilterConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.timeouts.forward_secs = 2;

    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = FilterServer::new(config, Arc::new(table), Arc::new(ledger));
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    addr
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
