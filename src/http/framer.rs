//! One request/response cycle over a raw byte stream.
//!
//! [`handle`] reads a request line and header block through a
//! [`BufferedStreamReader`], exposes the body as a [`BoundedReader`] limited
//! to `Content-Length`, calls the [`Handler`], drains whatever body the
//! handler left unread, and writes the response.
//!
//! Handler failures (returned errors and panics) become a
//! `500 Internal Server Error` whose body is the error message. Everything
//! else aborts the cycle with a [`FrameError`]; the caller is expected to
//! close the connection.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;

use futures_util::FutureExt;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;
use tracing::{debug, warn};

use super::{Headers, Request, Response, Status};
use crate::config::Limits;
use crate::io::{BoundedReader, BufferedStreamReader, ReadError};

/// Error a handler may return; its `Display` text becomes the 500 body.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Future returned by a [`Handler`], borrowing the request it was given.
pub type HandlerFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Response, HandlerError>> + Send + 'a>>;

/// Application callback invoked once per connection.
pub trait Handler: Send + Sync {
    fn call<'a>(&'a self, request: Request<'a>) -> HandlerFuture<'a>;
}

/// A [`Handler`] built from a closure; see [`handler_fn`].
#[derive(Clone)]
pub struct HandlerFn<F> {
    f: F,
}

/// Wraps a closure returning a boxed future as a [`Handler`].
///
/// # Examples
///
/// ```
/// use ringhttp::http::{Response, handler_fn};
///
/// let handler = handler_fn(|req| Box::pin(async move {
///     Ok(Response::ok(format!("you asked for {}", req.path())))
/// }));
/// # let _ = handler;
/// ```
pub fn handler_fn<F>(f: F) -> HandlerFn<F>
where
    F: for<'a> Fn(Request<'a>) -> HandlerFuture<'a> + Send + Sync,
{
    HandlerFn { f }
}

impl<F> Handler for HandlerFn<F>
where
    F: for<'a> Fn(Request<'a>) -> HandlerFuture<'a> + Send + Sync,
{
    fn call<'a>(&'a self, request: Request<'a>) -> HandlerFuture<'a> {
        (self.f)(request)
    }
}

/// Errors that abort a request/response cycle.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("request line exceeds {max} bytes")]
    RequestLineTooLarge { max: usize },

    #[error("request headers exceed {max} bytes")]
    HeadersTooLarge { max: usize },

    #[error("failed to read request: {0}")]
    Read(#[from] ReadError),

    #[error("failed to write response: {0}")]
    Io(#[from] std::io::Error),

    #[error("cancelled while waiting for the request")]
    Cancelled,
}

impl FrameError {
    /// `true` when the peer closed the stream before sending a full request head.
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, Self::Read(ReadError::UnexpectedEndOfStream))
    }
}

/// Processes exactly one request/response cycle with the default [`Limits`].
///
/// Reading the request head is abandoned with [`FrameError::Cancelled`] once
/// `cancel` turns `true`. A dropped sender never cancels.
///
/// # Examples
///
/// ```
/// use ringhttp::http::{Response, handle, handler_fn};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let handler = handler_fn(|_req| Box::pin(async { Ok(Response::ok("test")) }));
/// let (_cancel_tx, cancel) = tokio::sync::watch::channel(false);
///
/// let mut output = Vec::new();
/// handle(&b"GET / HTTP/1.0\r\n\r\n"[..], &mut output, &handler, cancel).await?;
/// assert_eq!(
///     output,
///     b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\nConnection: Closed\r\n\r\ntest"
/// );
/// # Ok(())
/// # }
/// ```
pub async fn handle<I, O, H>(
    input: I,
    output: O,
    handler: &H,
    cancel: watch::Receiver<bool>,
) -> Result<(), FrameError>
where
    I: AsyncRead + Unpin + Send,
    O: AsyncWrite + Unpin + Send,
    H: Handler + ?Sized,
{
    handle_with_limits(input, output, handler, cancel, &Limits::default()).await
}

/// [`handle`] with explicit size limits.
pub async fn handle_with_limits<I, O, H>(
    input: I,
    mut output: O,
    handler: &H,
    mut cancel: watch::Receiver<bool>,
    limits: &Limits,
) -> Result<(), FrameError>
where
    I: AsyncRead + Unpin + Send,
    O: AsyncWrite + Unpin + Send,
    H: Handler + ?Sized,
{
    let mut reader = BufferedStreamReader::with_chunk_size(input, limits.refill_chunk);

    let head = tokio::select! {
        head = read_head(&mut reader, limits) => head,
        () = cancelled(&mut cancel) => return Err(FrameError::Cancelled),
    };
    let (line, headers) = match head {
        Ok(head) => head,
        Err(err) => {
            reject(&mut output, &err).await;
            return Err(err);
        }
    };

    let content_length = headers.content_length();
    let mut body = BoundedReader::new(reader, content_length);
    let request = Request::new(&line, headers, &mut body);
    debug!(
        method = %request.method(),
        path = %request.path(),
        content_length,
        "dispatching request"
    );

    let response = match AssertUnwindSafe(handler.call(request)).catch_unwind().await {
        Ok(Ok(response)) => response,
        Ok(Err(err)) => {
            warn!(error = %err, "handler failed");
            Response::error(Status::INTERNAL_SERVER_ERROR, err.to_string())
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            warn!(panic = %message, "handler panicked");
            Response::error(Status::INTERNAL_SERVER_ERROR, message)
        }
    };

    let skipped = body.skip_remaining_in_chunks(limits.skip_chunk).await?;
    if skipped > 0 {
        debug!(skipped, "drained unread request body");
    }

    response.write_to(&mut output).await?;
    Ok(())
}

/// Reads the request line and the header block.
async fn read_head<R>(
    reader: &mut BufferedStreamReader<R>,
    limits: &Limits,
) -> Result<(String, Headers), FrameError>
where
    R: AsyncRead + Unpin,
{
    let line = reader
        .read_line(limits.max_request_line)
        .await
        .map_err(|err| match err {
            ReadError::LimitExceeded { max } => FrameError::RequestLineTooLarge { max },
            other => FrameError::Read(other),
        })?;

    let max = limits.max_header_bytes;
    let mut headers = Headers::new();
    let mut total = 0usize;
    loop {
        let raw = reader
            .read_bytes_until(b'\n', max)
            .await
            .map_err(|err| match err {
                ReadError::LimitExceeded { .. } => FrameError::HeadersTooLarge { max },
                other => FrameError::Read(other),
            })?;
        total += raw.len();
        if total > max {
            return Err(FrameError::HeadersTooLarge { max });
        }

        let raw = String::from_utf8_lossy(&raw);
        if raw.trim().is_empty() {
            break;
        }
        headers.insert_line(&raw);
    }
    Ok((line, headers))
}

/// Best-effort 4xx for oversized requests. Write failures are ignored since
/// the connection is being torn down anyway.
async fn reject<O>(output: &mut O, err: &FrameError)
where
    O: AsyncWrite + Unpin + Send,
{
    let status = match err {
        FrameError::RequestLineTooLarge { .. } => Status::URI_TOO_LONG,
        FrameError::HeadersTooLarge { .. } => Status::REQUEST_HEADER_FIELDS_TOO_LARGE,
        _ => return,
    };
    warn!(error = %err, status = status.code(), "rejecting request");
    if let Err(write_err) = Response::error(status, err.to_string()).write_to(output).await {
        debug!(error = %write_err, "failed to send rejection");
    }
}

/// Resolves once `signal` reads `true`; never resolves if the sender is gone.
pub(crate) async fn cancelled(signal: &mut watch::Receiver<bool>) {
    let closed = signal.wait_for(|&cancelled| cancelled).await.is_err();
    if closed {
        std::future::pending::<()>().await;
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_owned()
    }
}
