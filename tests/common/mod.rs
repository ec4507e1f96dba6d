//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use admission_gate::config::loader::finalize_with;
use admission_gate::{GateConfig, HttpServer, Shutdown};

pub const PREVIEW_PASSWORD: &str = "mindmuscle2025";
pub const ADMIN_PASSWORD: &str = "admin-secret-key";
pub const ALLOWED_ORIGIN: &str = "https://mindandmuscle.ai";

/// Start a mock upstream that answers every request with
/// `upstream: <METHOD> <path>` and echoes the `x-request-id` it saw.
pub async fn start_mock_upstream() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }

                let head = String::from_utf8_lossy(&buf).to_string();
                let request_line = head.lines().next().unwrap_or_default();
                let mut parts = request_line.split_whitespace();
                let body = format!(
                    "upstream: {} {}",
                    parts.next().unwrap_or_default(),
                    parts.next().unwrap_or_default()
                );
                let request_id = head
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("x-request-id")
                            .then(|| value.trim().to_string())
                    })
                    .unwrap_or_default();

                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nX-Seen-Request-Id: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    request_id,
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Standard config pointed at `upstream`, both passwords set.
pub fn gate_config(upstream: SocketAddr) -> GateConfig {
    let mut config = GateConfig::standard();
    config.upstream.url = format!("http://{}", upstream);
    finalize_with(config, |name| match name {
        "PREVIEW_PASSWORD" => Some(PREVIEW_PASSWORD.to_string()),
        "ADMIN_PASSWORD" => Some(ADMIN_PASSWORD.to_string()),
        _ => None,
    })
    .unwrap()
}

/// Run the gate on an ephemeral port until the returned `Shutdown` fires.
pub async fn spawn_gate(config: GateConfig) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(config).unwrap();
    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, receiver).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    (addr, shutdown)
}
