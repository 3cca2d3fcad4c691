//! Minimal server: greets `GET /` and echoes `POST /echo` bodies.
//!
//! ```text
//! RUST_LOG=ringhttp=debug cargo run --example hello_world -- [config.json]
//! curl http://127.0.0.1:8080/
//! curl -d 'ping' http://127.0.0.1:8080/echo
//! ```

use ringhttp::config::ServerConfig;
use ringhttp::http::{HandlerError, Method, Response, Status, handler_fn};
use ringhttp::server::Server;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match std::env::args().nth(1) {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };

    let server = Server::with_config(config).await?;
    println!("Listening on http://{}", server.local_addr());

    let (shutdown_tx, shutdown) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = shutdown_tx.send(true);
        }
    });

    let handler = handler_fn(|mut req| {
        Box::pin(async move {
            match (req.method(), req.path()) {
                (Method::Get, "/") => {
                    Ok(Response::ok("Hello, world!\n").header("Content-Type", "text/plain"))
                }
                (Method::Get, _) => Ok(Response::error(Status::NOT_FOUND, "not found")),
                (Method::Post, "/echo") => {
                    let body = req.body().read_to_end().await?;
                    Ok::<_, HandlerError>(
                        Response::ok(body).header("Content-Type", "application/octet-stream"),
                    )
                }
                _ => Ok(Response::error(Status::METHOD_NOT_ALLOWED, "method not allowed")),
            }
        })
    });

    server.run_until(handler, shutdown).await?;
    Ok(())
}
