//! Tests for server shutdown.
//!
//! Tests cover:
//! - An idle server stops as soon as the shutdown signal fires
//! - A request that never finishes does not hold the server past the drain deadline
//! - A request that finishes within the deadline is answered

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, routing::get};
use tokengate::serve_until;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Notify, oneshot};
use tokio::task::JoinHandle;

struct RunningServer {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<Result<(), std::io::Error>>,
    addr: std::net::SocketAddr,
}

async fn start(app: Router, drain_timeout: Duration) -> RunningServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();

    let handle = tokio::spawn(serve_until(
        listener,
        app,
        async move {
            let _ = stopped.await;
        },
        drain_timeout,
    ));

    RunningServer { stop, handle, addr }
}

async fn send_request(addr: std::net::SocketAddr, path: &str) -> TcpStream {
    let stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {} HTTP/1.1\r\nHost: localhost\r\n\r\n", path);
    let mut remaining = request.as_bytes();
    while !remaining.is_empty() {
        stream.writable().await.unwrap();
        match stream.try_write(remaining) {
            Ok(n) => remaining = &remaining[n..],
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
            Err(e) => panic!("write failed: {}", e),
        }
    }
    stream
}

/// Read until the server closes the connection.
async fn read_response(stream: &TcpStream) -> String {
    let mut response = Vec::new();
    let mut buf = vec![0u8; 1024];
    loop {
        stream.readable().await.unwrap();
        match stream.try_read(&mut buf) {
            Ok(0) => return String::from_utf8_lossy(&response).to_string(),
            Ok(n) => response.extend_from_slice(&buf[..n]),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => continue,
            Err(e) => panic!("read failed: {}", e),
        }
    }
}

// =============================================================================
// Shutdown
// =============================================================================

#[tokio::test]
async fn test_idle_server_stops_on_signal() {
    let server = start(Router::new(), Duration::from_secs(30)).await;

    server.stop.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), server.handle)
        .await
        .expect("server should stop promptly");
    assert!(result.unwrap().is_ok());
}

#[tokio::test]
async fn test_stuck_request_does_not_block_shutdown_past_deadline() {
    let entered = Arc::new(Notify::new());
    let app = {
        let entered = entered.clone();
        Router::new().route(
            "/stuck",
            get(move || {
                let entered = entered.clone();
                async move {
                    entered.notify_one();
                    std::future::pending::<&'static str>().await
                }
            }),
        )
    };
    let server = start(app, Duration::from_millis(200)).await;

    let _stream = send_request(server.addr, "/stuck").await;
    tokio::time::timeout(Duration::from_secs(5), entered.notified())
        .await
        .expect("handler should start");

    server.stop.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), server.handle)
        .await
        .expect("server should stop once the drain deadline passes");
    assert!(result.unwrap().is_ok());
}

#[tokio::test]
async fn test_in_flight_request_finishes_within_deadline() {
    let entered = Arc::new(Notify::new());
    let app = {
        let entered = entered.clone();
        Router::new().route(
            "/slow",
            get(move || {
                let entered = entered.clone();
                async move {
                    entered.notify_one();
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    "done"
                }
            }),
        )
    };
    let server = start(app, Duration::from_secs(10)).await;

    let stream = send_request(server.addr, "/slow").await;
    tokio::time::timeout(Duration::from_secs(5), entered.notified())
        .await
        .expect("handler should start");

    server.stop.send(()).unwrap();

    let response = tokio::time::timeout(Duration::from_secs(5), read_response(&stream))
        .await
        .expect("response should arrive");
    assert!(response.starts_with("HTTP/1.1 200"), "got {:?}", response);
    assert!(response.ends_with("done"));

    let result = tokio::time::timeout(Duration::from_secs(5), server.handle)
        .await
        .expect("server should stop after the request completes");
    assert!(result.unwrap().is_ok());
}
