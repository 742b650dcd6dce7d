//! HTTP/1.1 exchange engine.
//!
//! [`HttpConnection`] drives exactly one request/response exchange at a time
//! over a pooled [`Connection`] and enforces the order the wire requires:
//!
//! 1. [`write_request`](HttpConnection::write_request) sends the request line and headers.
//! 2. Optionally open a [fixed-length](HttpConnection::open_fixed_length_writer) or
//!    [chunked](HttpConnection::open_chunked_writer) request body writer, write to it
//!    and close it (or send a buffered body with
//!    [`write_request_body`](HttpConnection::write_request_body)).
//! 3. [`read_response`](HttpConnection::read_response) reads the final response head.
//! 4. Open a [fixed-length](HttpConnection::open_fixed_length_reader),
//!    [chunked](HttpConnection::open_chunked_reader) or
//!    [unknown-length](HttpConnection::open_unknown_length_reader) body reader, read it
//!    to the end, or call [`empty_response_body`](HttpConnection::empty_response_body).
//!
//! When the response body is exhausted the engine is `Idle` again and applies
//! its [`OnIdle`] policy. Out-of-order calls fail with [`NetError::IllegalState`].

use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use crate::http::bodyreader::{ChunkedReader, FixedLengthReader, UnknownLengthReader};
use crate::http::bodywriter::{ChunkedWriter, FixedLengthWriter};
use crate::http::headers::Headers;
use crate::http::httpcache::CacheSink;
use crate::http::requestbody::RequestBody;
use crate::http::statusline::StatusLine;
use crate::socket::connection::{Connection, ConnectionStream};
use crate::socket::pool::ConnectionPool;
use bytes::{BufMut, BytesMut};
use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt};

/// Budget for draining an abandoned response body so the connection can be reused.
pub const DISCARD_STREAM_TIMEOUT: Duration = Duration::from_millis(100);

/// Longest status, header or chunk-size line accepted from a peer.
const MAX_LINE_LENGTH: u64 = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Ready to write request headers.
    Idle,
    RequestBodyOpen,
    WritingRequestBody,
    AwaitingResponseHeaders,
    ResponseBodyOpen,
    ReadingResponseBody,
    Closed,
}

/// What happens to the connection the instant the exchange completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnIdle {
    /// Leave the connection to the caller.
    #[default]
    Hold,
    ReturnToPool,
    Close,
}

/// Final (non-interim) response status and headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub status: StatusLine,
    pub headers: Headers,
}

impl ResponseHead {
    /// Declared `Content-Length`, if present and well formed.
    pub fn content_length(&self) -> Option<u64> {
        self.headers.get("Content-Length")?.trim().parse().ok()
    }

    /// Whether the body uses chunked transfer coding.
    pub fn is_chunked(&self) -> bool {
        self.headers
            .get("Transfer-Encoding")
            .is_some_and(|v| v.eq_ignore_ascii_case("chunked"))
    }
}

async fn with_timeout<T, F>(timeout: Option<Duration>, connection_id: u64, io: F) -> Result<T, NetError>
where
    F: Future<Output = io::Result<T>>,
{
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, io).await {
            Ok(result) => result.transport_context(connection_id),
            Err(_) => Err(NetError::ConnectionTimedOut),
        },
        None => io.await.transport_context(connection_id),
    }
}

pub struct HttpConnection {
    pool: Arc<ConnectionPool>,
    connection: Arc<Connection>,
    /// Checked out of `connection` while this engine owns the exchange.
    stream: Option<ConnectionStream>,
    state: State,
    on_idle: OnIdle,
    trailers: Option<Headers>,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
}

impl HttpConnection {
    /// Bind an engine to `connection`, taking its byte stream for the exchange.
    ///
    /// Fails with [`NetError::SocketNotConnected`] if the connection is closed
    /// or another engine holds its stream.
    pub fn new(pool: Arc<ConnectionPool>, connection: Arc<Connection>) -> Result<Self, NetError> {
        let stream = connection.take_stream()?;
        Ok(Self {
            pool,
            connection,
            stream: Some(stream),
            state: State::Idle,
            on_idle: OnIdle::Hold,
            trailers: None,
            read_timeout: None,
            write_timeout: None,
        })
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn on_idle(&self) -> OnIdle {
        self.on_idle
    }

    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// Returns true if this engine closed its connection.
    pub fn is_closed(&self) -> bool {
        self.state == State::Closed
    }

    /// Deadline applied to each individual read from the channel.
    pub fn set_read_timeout(&mut self, timeout: Option<Duration>) {
        self.read_timeout = timeout;
    }

    /// Deadline applied to each individual write to the channel.
    pub fn set_write_timeout(&mut self, timeout: Option<Duration>) {
        self.write_timeout = timeout;
    }

    /// Trailers of the last chunked response body, once it was read to the end.
    pub fn trailers(&self) -> Option<&Headers> {
        self.trailers.as_ref()
    }

    /// Put the connection back into the pool when the response body is exhausted.
    /// If the engine is already idle this happens immediately.
    pub fn pool_on_idle(&mut self) {
        self.on_idle = OnIdle::ReturnToPool;
        if self.state == State::Idle {
            self.on_idle = OnIdle::Hold;
            self.recycle();
        }
    }

    /// Close the connection when the response body is exhausted.
    /// If the engine is already idle this happens immediately.
    pub fn close_on_idle(&mut self) {
        self.on_idle = OnIdle::Close;
        if self.state == State::Idle {
            self.state = State::Closed;
            self.close_connection();
        }
    }

    pub async fn flush(&mut self) -> Result<(), NetError> {
        let id = self.connection.id();
        let timeout = self.write_timeout;
        let stream = self.stream_mut()?;
        let result = with_timeout(timeout, id, stream.flush()).await;
        self.check_io(result)
    }

    /// Write the request line and headers.
    pub async fn write_request(&mut self, headers: &Headers, request_line: &str) -> Result<(), NetError> {
        self.expect_state(State::Idle)?;
        let mut buf = BytesMut::with_capacity(request_line.len() + 2 + headers.len() * 32 + 2);
        buf.put_slice(request_line.as_bytes());
        buf.put_slice(b"\r\n");
        headers.encode(&mut buf);
        buf.put_slice(b"\r\n");

        self.write_all(&buf).await?;
        self.trailers = None;
        self.state = State::RequestBodyOpen;
        Ok(())
    }

    /// Send a fully buffered request body in one step. The caller is
    /// responsible for a matching `Content-Length` header.
    pub async fn write_request_body(&mut self, body: &RequestBody) -> Result<(), NetError> {
        self.expect_state(State::RequestBodyOpen)?;
        self.state = State::AwaitingResponseHeaders;
        self.write_all(body.as_bytes()).await
    }

    pub fn open_fixed_length_writer(&mut self, content_length: u64) -> Result<FixedLengthWriter<'_>, NetError> {
        self.expect_state(State::RequestBodyOpen)?;
        self.state = State::WritingRequestBody;
        Ok(FixedLengthWriter::new(self, content_length))
    }

    pub fn open_chunked_writer(&mut self) -> Result<ChunkedWriter<'_>, NetError> {
        self.expect_state(State::RequestBodyOpen)?;
        self.state = State::WritingRequestBody;
        Ok(ChunkedWriter::new(self))
    }

    /// Read the final response head, skipping any `100 Continue` interim responses.
    pub async fn read_response(&mut self) -> Result<ResponseHead, NetError> {
        if !matches!(self.state, State::RequestBodyOpen | State::AwaitingResponseHeaders) {
            return Err(NetError::IllegalState(self.state));
        }

        loop {
            let line = self.read_line().await?;
            let status = match StatusLine::parse(&line) {
                Ok(status) => status,
                Err(e) => {
                    self.abandon(e);
                    return Err(e);
                }
            };
            let headers = self.read_headers().await?;

            if !status.is_continue() {
                self.state = State::ResponseBodyOpen;
                return Ok(ResponseHead { status, headers });
            }
            tracing::trace!(conn = self.connection.id(), "skipping interim 100 response");
        }
    }

    pub fn open_fixed_length_reader(
        &mut self,
        cache: Option<Box<dyn CacheSink>>,
        length: u64,
    ) -> Result<FixedLengthReader<'_>, NetError> {
        self.expect_state(State::ResponseBodyOpen)?;
        self.state = State::ReadingResponseBody;
        Ok(FixedLengthReader::new(self, cache, length))
    }

    pub fn open_chunked_reader(&mut self, cache: Option<Box<dyn CacheSink>>) -> Result<ChunkedReader<'_>, NetError> {
        self.expect_state(State::ResponseBodyOpen)?;
        self.state = State::ReadingResponseBody;
        Ok(ChunkedReader::new(self, cache))
    }

    pub fn open_unknown_length_reader(
        &mut self,
        cache: Option<Box<dyn CacheSink>>,
    ) -> Result<UnknownLengthReader<'_>, NetError> {
        self.expect_state(State::ResponseBodyOpen)?;
        self.state = State::ReadingResponseBody;
        Ok(UnknownLengthReader::new(self, cache))
    }

    /// Advance past a response that has no body.
    pub fn empty_response_body(&mut self) -> Result<(), NetError> {
        self.open_fixed_length_reader(None, 0).map(drop)
    }

    fn expect_state(&self, expected: State) -> Result<(), NetError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(NetError::IllegalState(self.state))
        }
    }

    fn stream_mut(&mut self) -> Result<&mut ConnectionStream, NetError> {
        self.stream.as_mut().ok_or(NetError::SocketNotConnected)
    }

    /// Any channel failure poisons the framing; the connection is discarded.
    fn check_io<T>(&mut self, result: Result<T, NetError>) -> Result<T, NetError> {
        if let Err(e) = &result {
            self.abandon(*e);
        }
        result
    }

    pub(crate) async fn write_all(&mut self, data: &[u8]) -> Result<(), NetError> {
        let id = self.connection.id();
        let timeout = self.write_timeout;
        let stream = self.stream_mut()?;
        let result = with_timeout(timeout, id, stream.write_all(data)).await;
        self.check_io(result)
    }

    /// Read up to `buf.len()` body bytes. Returns 0 at end of stream.
    pub(crate) async fn read_body(&mut self, buf: &mut [u8]) -> Result<usize, NetError> {
        let id = self.connection.id();
        let timeout = self.read_timeout;
        let stream = self.stream_mut()?;
        let read = with_timeout(timeout, id, stream.read(buf)).await?;
        if read == 0 && !buf.is_empty() {
            self.connection.mark_eof();
        }
        Ok(read)
    }

    /// Read one LF or CRLF terminated line, without its terminator.
    pub(crate) async fn read_line(&mut self) -> Result<String, NetError> {
        let id = self.connection.id();
        let timeout = self.read_timeout;
        let stream = self.stream_mut()?;
        let mut line = Vec::new();
        let mut limited = (&mut *stream).take(MAX_LINE_LENGTH);
        let result = with_timeout(timeout, id, limited.read_until(b'\n', &mut line)).await;
        self.check_io(result)?;

        if line.last() != Some(&b'\n') {
            let error = if line.len() as u64 >= MAX_LINE_LENGTH {
                NetError::ResponseHeadersTooBig
            } else {
                self.connection.mark_eof();
                if line.is_empty() {
                    NetError::ConnectionClosed
                } else {
                    NetError::ResponseHeadersTruncated
                }
            };
            self.abandon(error);
            return Err(error);
        }

        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        Ok(String::from_utf8_lossy(&line).into_owned())
    }

    /// Read a header block up to and including its blank terminating line.
    pub(crate) async fn read_headers(&mut self) -> Result<Headers, NetError> {
        let mut headers = Headers::new();
        loop {
            let line = self.read_line().await?;
            if line.is_empty() {
                return Ok(headers);
            }
            headers.add_line(&line);
        }
    }

    pub(crate) fn set_trailers(&mut self, trailers: Headers) {
        self.trailers = Some(trailers);
    }

    /// The request body writer was closed with its framing intact.
    pub(crate) fn request_body_complete(&mut self) {
        if self.state == State::WritingRequestBody {
            self.state = State::AwaitingResponseHeaders;
        }
    }

    /// The response body boundary was reached: go idle and apply the policy.
    pub(crate) fn end_of_input(&mut self) {
        if self.state != State::ReadingResponseBody {
            return;
        }

        self.state = State::Idle;
        match self.on_idle {
            OnIdle::ReturnToPool => {
                self.on_idle = OnIdle::Hold;
                self.recycle();
            }
            OnIdle::Close => {
                self.state = State::Closed;
                self.close_connection();
            }
            OnIdle::Hold => {}
        }
    }

    /// The exchange cannot complete: close the connection for good.
    pub(crate) fn abandon(&mut self, error: NetError) {
        if self.state != State::Closed {
            tracing::debug!(
                conn = self.connection.id(),
                state = ?self.state,
                error = %error,
                "abandoning exchange"
            );
        }
        self.state = State::Closed;
        self.close_connection();
    }

    /// Hand the stream back to the connection and the connection to the pool.
    /// No-op if this engine no longer holds the stream.
    fn recycle(&mut self) {
        if let Some(stream) = self.stream.take() {
            self.connection.restore_stream(stream);
            self.pool.release(Arc::clone(&self.connection));
        }
    }

    /// Close the connection, but only if this engine still owns it.
    fn close_connection(&mut self) {
        if let Some(stream) = self.stream.take() {
            drop(stream);
            self.connection.close();
        }
    }
}

impl Drop for HttpConnection {
    fn drop(&mut self) {
        let Some(stream) = self.stream.take() else {
            return;
        };
        if self.state == State::Idle {
            // Held connection: the caller decides where it goes next.
            self.connection.restore_stream(stream);
        } else {
            tracing::debug!(conn = self.connection.id(), state = ?self.state, "engine dropped mid-exchange");
            drop(stream);
            self.connection.close();
        }
    }
}
