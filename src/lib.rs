//! # ringhttp
//!
//! A from-scratch HTTP/1.x framer over raw async byte streams, built on its
//! own buffering primitives instead of an HTTP library.
//!
//! ## Layers
//!
//! - [`buffer`] — power-of-two [`RingBuffer`](buffer::RingBuffer) and the
//!   [`GrowableDeque`](buffer::GrowableDeque) that reallocates it on overflow.
//! - [`io`] — [`BufferedStreamReader`](io::BufferedStreamReader), which
//!   refills from the stream only when its buffer runs dry, and
//!   [`BoundedReader`](io::BoundedReader) for `Content-Length` bodies.
//! - [`http`] — request/response types and [`http::handle`], which runs one
//!   request/response cycle on a connection.
//! - [`server`] — a TCP accept loop that supervises one task per connection.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ringhttp::http::{Response, handler_fn};
//! use ringhttp::server::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = Server::bind("127.0.0.1:8080").await?;
//!     println!("Listening on http://{}", server.local_addr());
//!     server
//!         .run(handler_fn(|req| Box::pin(async move {
//!             Ok(Response::ok(format!("Hello from {}", req.path())))
//!         })))
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod buffer;
pub mod config;
pub mod http;
pub mod io;
pub mod server;

// ── Convenience re-exports ────────────────────────────────────────────────────
pub use config::{Limits, ServerConfig};
pub use http::{
    Handler, Headers, Method, Request, Response, ResponseBody, Status, handle, handler_fn,
};
pub use server::{Server, ServerError};
