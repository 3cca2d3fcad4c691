//! Async TCP server using Tokio.
//!
//! Accepts TCP connections and runs one request/response cycle per
//! connection through [`http::handle_with_limits`](crate::http::handle_with_limits).
//! Connection tasks are owned by a [`JoinSet`] supervisor that logs how each
//! one ended, so a failing connection never takes the listener down.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Semaphore, watch};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::config::{ConfigError, Limits, ServerConfig};
use crate::http::framer::{FrameError, Handler, cancelled, handle_with_limits};

/// Errors produced by the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

type ConnectionOutcome = (SocketAddr, Result<(), FrameError>);

/// A TCP listener that serves one HTTP request per connection.
///
/// # Examples
///
/// ```rust,no_run
/// use ringhttp::http::{Response, handler_fn};
/// use ringhttp::server::Server;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let server = Server::bind("127.0.0.1:8080").await?;
///     server
///         .run(handler_fn(|_req| Box::pin(async { Ok(Response::ok("Hello!")) })))
///         .await?;
///     Ok(())
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
    config: ServerConfig,
}

impl Server {
    /// Binds to `addr` with otherwise default settings.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound
    /// (e.g. port already in use, insufficient permissions).
    pub async fn bind(addr: impl AsRef<str>) -> Result<Self, ServerError> {
        let config = ServerConfig {
            bind_address: addr.as_ref().to_owned(),
            ..ServerConfig::default()
        };
        Self::with_config(config).await
    }

    /// Validates `config`, then binds to `config.bind_address`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] for an invalid config and
    /// [`ServerError::Bind`] if the address cannot be bound.
    pub async fn with_config(config: ServerConfig) -> Result<Self, ServerError> {
        config.validate()?;
        let listener = TcpListener::bind(&config.bind_address)
            .await
            .map_err(|e| ServerError::Bind {
                addr: config.bind_address.clone(),
                source: e,
            })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
            config,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serves connections until the process is terminated.
    pub async fn run<H>(self, handler: H) -> Result<(), ServerError>
    where
        H: Handler + 'static,
    {
        let (_never, shutdown) = watch::channel(false);
        self.run_until(handler, shutdown).await
    }

    /// Serves connections until `shutdown` turns `true`.
    ///
    /// On shutdown the listener stops accepting, connections still waiting
    /// for their request head are cancelled, and the call returns once every
    /// connection task has finished.
    ///
    /// # Errors
    ///
    /// Currently infallible once bound; accept errors are logged and skipped.
    pub async fn run_until<H>(
        self,
        handler: H,
        shutdown: watch::Receiver<bool>,
    ) -> Result<(), ServerError>
    where
        H: Handler + 'static,
    {
        let handler = Arc::new(handler);
        let limits = Arc::new(self.config.limits.clone());
        let permits = Arc::new(Semaphore::new(self.config.max_connections));
        let mut stop = shutdown.clone();
        let mut tasks: JoinSet<ConnectionOutcome> = JoinSet::new();

        info!(
            address = %self.local_addr,
            max_connections = self.config.max_connections,
            "listening"
        );

        loop {
            while let Some(joined) = tasks.try_join_next() {
                log_exit(joined);
            }

            let permit = tokio::select! {
                () = cancelled(&mut stop) => break,
                permit = Arc::clone(&permits).acquire_owned() => permit,
            };
            // The semaphore is never closed.
            let Ok(permit) = permit else { break };

            let (stream, peer) = tokio::select! {
                () = cancelled(&mut stop) => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!(error = %e, "failed to accept connection");
                        continue;
                    }
                },
            };

            debug!(peer = %peer, "connection accepted");
            let handler = Arc::clone(&handler);
            let limits = Arc::clone(&limits);
            let cancel = shutdown.clone();
            tasks.spawn(async move {
                let _permit = permit;
                let result = serve_connection(stream, &*handler, cancel, &limits).await;
                (peer, result)
            });
        }

        info!(in_flight = tasks.len(), "shutting down");
        while let Some(joined) = tasks.join_next().await {
            log_exit(joined);
        }
        info!("all connections closed");
        Ok(())
    }
}

/// Runs one request/response cycle, then shuts the socket down.
async fn serve_connection<H>(
    mut stream: TcpStream,
    handler: &H,
    cancel: watch::Receiver<bool>,
    limits: &Limits,
) -> Result<(), FrameError>
where
    H: Handler + ?Sized,
{
    let (input, output) = stream.split();
    let result = handle_with_limits(input, output, handler, cancel, limits).await;
    if let Err(e) = stream.shutdown().await {
        debug!(error = %e, "socket shutdown failed");
    }
    result
}

fn log_exit(joined: Result<ConnectionOutcome, JoinError>) {
    match joined {
        Ok((peer, Ok(()))) => debug!(peer = %peer, "connection closed"),
        Ok((peer, Err(FrameError::Cancelled))) => {
            debug!(peer = %peer, "connection cancelled by shutdown");
        }
        Ok((peer, Err(e))) if e.is_end_of_stream() => {
            debug!(peer = %peer, "peer closed before sending a request");
        }
        Ok((peer, Err(e))) => warn!(peer = %peer, error = %e, "connection closed with error"),
        Err(e) if e.is_panic() => error!(error = %e, "connection task panicked"),
        Err(e) => debug!(error = %e, "connection task aborted"),
    }
}
