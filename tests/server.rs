//! End-to-end tests over real TCP sockets.

use std::net::SocketAddr;
use std::time::Duration;

use ringhttp::config::ServerConfig;
use ringhttp::http::{HandlerError, Response, handler_fn};
use ringhttp::server::{Server, ServerError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;

type ServerTask = JoinHandle<Result<(), ServerError>>;

async fn start() -> (SocketAddr, watch::Sender<bool>, ServerTask) {
    let server = Server::bind("127.0.0.1:0").await.unwrap();
    let addr = server.local_addr();
    let handler = handler_fn(|mut req| {
        Box::pin(async move {
            let body = req.body().read_to_end().await?;
            let reply = format!("{} {} {}", req.method(), req.path(), body.len());
            Ok::<_, HandlerError>(Response::ok(reply))
        })
    });
    let (tx, shutdown) = watch::channel(false);
    let task = tokio::spawn(server.run_until(handler, shutdown));
    (addr, tx, task)
}

async fn roundtrip(addr: SocketAddr, request: &[u8]) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();
    let mut out = String::new();
    stream.read_to_string(&mut out).await.unwrap();
    out
}

#[tokio::test]
async fn serves_one_request_per_connection() {
    let (addr, tx, task) = start().await;

    let out = roundtrip(addr, b"POST /submit HTTP/1.1\r\nContent-Length: 3\r\n\r\nabc").await;
    assert_eq!(
        out,
        "HTTP/1.1 200 OK\r\nContent-Length: 14\r\nConnection: Closed\r\n\r\nPOST /submit 3"
    );

    tx.send(true).unwrap();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn concurrent_connections() {
    let (addr, tx, task) = start().await;

    let clients: Vec<_> = (0..16)
        .map(|n| {
            tokio::spawn(async move {
                let request = format!("GET /item/{n} HTTP/1.1\r\nHost: test\r\n\r\n");
                roundtrip(addr, request.as_bytes()).await
            })
        })
        .collect();

    for (n, client) in clients.into_iter().enumerate() {
        let out = client.await.unwrap();
        assert!(out.starts_with("HTTP/1.1 200 OK\r\n"), "client {n}: {out}");
        assert!(out.ends_with(&format!("GET /item/{n} 0")), "client {n}: {out}");
    }

    tx.send(true).unwrap();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn shutdown_cancels_idle_connections() {
    let (addr, tx, task) = start().await;

    // Connected but never sends a request.
    let mut idle = TcpStream::connect(addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("server did not stop")
        .unwrap()
        .unwrap();

    let mut out = Vec::new();
    idle.read_to_end(&mut out).await.unwrap();
    assert!(out.is_empty());
}

#[tokio::test]
async fn with_config_honours_limits() {
    let config = ServerConfig::from_json_str(
        r#"{ "bind_address": "127.0.0.1:0", "limits": { "max_request_line": 32 } }"#,
    )
    .unwrap();
    let server = Server::with_config(config).await.unwrap();
    let addr = server.local_addr();
    let handler = handler_fn(|_req| Box::pin(async { Ok(Response::ok("unreachable")) }));
    let (tx, shutdown) = watch::channel(false);
    let task = tokio::spawn(server.run_until(handler, shutdown));

    let request = b"GET /a-path-that-is-far-too-long-for-the-limit HTTP/1.1\r\n\r\n";
    let out = roundtrip(addr, request).await;
    assert!(out.starts_with("HTTP/1.1 414 URI Too Long\r\n"), "{out}");

    tx.send(true).unwrap();
    task.await.unwrap().unwrap();
}

#[tokio::test]
async fn bind_failure_is_reported() {
    let first = Server::bind("127.0.0.1:0").await.unwrap();
    let taken = first.local_addr().to_string();
    let err = Server::bind(&taken).await.err().unwrap();
    assert!(matches!(err, ServerError::Bind { addr, .. } if addr == taken));
}

#[tokio::test]
async fn with_config_rejects_invalid_connection_limits() {
    for max_connections in [0, tokio::sync::Semaphore::MAX_PERMITS + 1] {
        let config = ServerConfig {
            bind_address: "127.0.0.1:0".to_owned(),
            max_connections,
            ..ServerConfig::default()
        };
        let err = Server::with_config(config).await.err().unwrap();
        assert!(matches!(err, ServerError::Config(_)), "{max_connections}: {err}");
    }
}
