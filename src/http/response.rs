//! HTTP/1.1 response builder and serializer.
//!
//! Provides a fluent builder API for constructing responses and writes them
//! to an async sink. The body can live in memory, come from an arbitrary
//! stream, or be read from a file at write time.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::{Headers, Status};

/// Value the framer always sends in the `Connection` header.
pub const CONNECTION_CLOSED: &str = "Closed";

/// The payload of a [`Response`].
///
/// Every variant knows its length up front, which becomes the
/// `Content-Length` header, and writes exactly that many bytes.
pub enum ResponseBody {
    /// Bytes already in memory.
    Memory(Bytes),
    /// An arbitrary stream; `len` bytes are copied from it.
    Stream {
        reader: Box<dyn AsyncRead + Send + Unpin>,
        len: u64,
    },
    /// A file opened when the response is written.
    File { path: PathBuf, len: u64 },
}

impl ResponseBody {
    pub fn empty() -> Self {
        Self::Memory(Bytes::new())
    }

    /// A body copied from `reader`, which must yield at least `len` bytes.
    pub fn stream(reader: impl AsyncRead + Send + Unpin + 'static, len: u64) -> Self {
        Self::Stream {
            reader: Box::new(reader),
            len,
        }
    }

    /// A body served from the file at `path`.
    ///
    /// The length is taken from the file's metadata now; the file is opened
    /// when the response is written.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file's metadata cannot be read.
    pub async fn file(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let len = tokio::fs::metadata(&path).await?.len();
        Ok(Self::File { path, len })
    }

    /// Number of bytes [`write_to`](Self::write_to) will write.
    pub fn len(&self) -> u64 {
        match self {
            Self::Memory(bytes) => bytes.len() as u64,
            Self::Stream { len, .. } | Self::File { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes the whole body to `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`io::ErrorKind::UnexpectedEof`] if a stream or file yields
    /// fewer bytes than its declared length, or any I/O error from either side.
    pub async fn write_to<W>(self, sink: &mut W) -> io::Result<()>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        match self {
            Self::Memory(bytes) => sink.write_all(&bytes).await,
            Self::Stream { reader, len } => copy_exact(reader, len, sink).await,
            Self::File { path, len } => {
                let file = tokio::fs::File::open(&path).await?;
                copy_exact(file, len, sink).await
            }
        }
    }
}

async fn copy_exact<R, W>(reader: R, len: u64, sink: &mut W) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + ?Sized,
{
    let copied = tokio::io::copy(&mut reader.take(len), sink).await?;
    if copied < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("response body ended after {copied} of {len} bytes"),
        ));
    }
    Ok(())
}

impl Default for ResponseBody {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Memory(bytes) => f.debug_tuple("Memory").field(&bytes.len()).finish(),
            Self::Stream { len, .. } => f.debug_struct("Stream").field("len", len).finish(),
            Self::File { path, len } => f
                .debug_struct("File")
                .field("path", path)
                .field("len", len)
                .finish(),
        }
    }
}

impl From<Bytes> for ResponseBody {
    fn from(bytes: Bytes) -> Self {
        Self::Memory(bytes)
    }
}

impl From<Vec<u8>> for ResponseBody {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Memory(Bytes::from(bytes))
    }
}

impl From<String> for ResponseBody {
    fn from(text: String) -> Self {
        Self::Memory(Bytes::from(text))
    }
}

impl From<&'static str> for ResponseBody {
    fn from(text: &'static str) -> Self {
        Self::Memory(Bytes::from_static(text.as_bytes()))
    }
}

/// An HTTP response, ready to be written to a connection.
///
/// # Examples
///
/// ```
/// use ringhttp::http::{Response, Status};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> std::io::Result<()> {
/// let response = Response::new(Status::OK)
///     .header("Content-Type", "application/json")
///     .body(r#"{"status":"ok"}"#);
///
/// let mut out = Vec::new();
/// response.write_to(&mut out).await?;
/// let text = String::from_utf8(out).unwrap();
/// assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
/// assert!(text.contains("Content-Length: 15\r\n"));
/// assert!(text.contains("Connection: Closed\r\n"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct Response {
    status: Status,
    headers: Headers,
    body: ResponseBody,
}

impl Response {
    /// Creates a response with the given status and an empty body.
    pub fn new(status: impl Into<Status>) -> Self {
        Self {
            status: status.into(),
            headers: Headers::new(),
            body: ResponseBody::empty(),
        }
    }

    /// A `200 OK` response carrying `body`.
    pub fn ok(body: impl Into<ResponseBody>) -> Self {
        Self::new(Status::OK).body(body)
    }

    /// A response whose body is `message` as plain text.
    pub fn error(status: impl Into<Status>, message: impl Into<String>) -> Self {
        Self::new(status).body(message.into())
    }

    /// Appends a header. Multiple calls with the same name are additive.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<ResponseBody>) -> Self {
        self.body = body.into();
        self
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn body_ref(&self) -> &ResponseBody {
        &self.body
    }

    /// Serializes the status line and headers, including the blank line.
    ///
    /// `Content-Length` is replaced with the body length and `Connection`
    /// with `Closed`, whatever the caller set.
    pub fn head_bytes(&mut self) -> BytesMut {
        self.headers
            .replace("Content-Length", self.body.len().to_string());
        self.headers.replace("Connection", CONNECTION_CLOSED);

        let mut buf = BytesMut::with_capacity(64 + self.headers.len() * 32);
        buf.put(format!("HTTP/1.1 {} {}\r\n", self.status.code(), self.status.reason()).as_bytes());
        buf.put(self.headers.to_string().as_bytes());
        buf.put(&b"\r\n"[..]);
        buf
    }

    /// Writes the full response to `out` and flushes it.
    pub async fn write_to<W>(mut self, out: &mut W) -> io::Result<()>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let head = self.head_bytes();
        out.write_all(&head).await?;
        self.body.write_to(out).await?;
        out.flush().await
    }
}
