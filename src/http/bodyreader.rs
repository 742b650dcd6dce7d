//! Response body readers.
//!
//! Every byte handed to the caller is also written to the optional cache
//! sink. Reaching the body boundary commits the sink and returns the engine to
//! `Idle`; any framing or transport failure aborts the sink and closes the
//! connection. Dropping a reader before its boundary counts as a failure.

use crate::base::neterror::NetError;
use crate::http::connection::{HttpConnection, State, DISCARD_STREAM_TIMEOUT};
use crate::http::headers::Headers;
use crate::http::httpcache::CacheSink;

/// Behavior shared by all readers: cache mirroring and completion.
struct ReaderBase<'a> {
    conn: &'a mut HttpConnection,
    cache: Option<Box<dyn CacheSink>>,
    closed: bool,
}

impl<'a> ReaderBase<'a> {
    fn new(conn: &'a mut HttpConnection, cache: Option<Box<dyn CacheSink>>) -> Self {
        Self {
            conn,
            cache,
            closed: false,
        }
    }

    fn ensure_open(&self) -> Result<(), NetError> {
        if self.closed {
            Err(NetError::BodyStreamClosed)
        } else {
            Ok(())
        }
    }

    /// Mirror bytes into the cache. A failing sink is dropped; the body keeps flowing.
    fn cache_write(&mut self, data: &[u8]) {
        let Some(sink) = self.cache.as_mut() else {
            return;
        };
        if let Err(e) = sink.write(data) {
            tracing::warn!(conn = self.conn.connection().id(), error = %e, "cache write failed");
            if let Some(sink) = self.cache.take() {
                sink.abort();
            }
        }
    }

    /// The body boundary was reached.
    fn end_of_input(&mut self) {
        if let Some(sink) = self.cache.take() {
            if let Err(e) = sink.close() {
                tracing::warn!(conn = self.conn.connection().id(), error = %e, "cache commit failed");
            }
        }
        self.conn.end_of_input();
    }

    /// The body ended early or its framing broke. Idempotent.
    fn unexpected_end_of_input(&mut self, error: NetError) {
        if let Some(sink) = self.cache.take() {
            sink.abort();
        }
        self.conn.abandon(error);
    }

    fn fail<T>(&mut self, error: NetError) -> Result<T, NetError> {
        self.unexpected_end_of_input(error);
        Err(error)
    }
}

impl Drop for ReaderBase<'_> {
    fn drop(&mut self) {
        if self.conn.state() == State::ReadingResponseBody {
            self.unexpected_end_of_input(NetError::BodyStreamClosed);
        }
    }
}

/// Body delimited by `Content-Length`.
pub struct FixedLengthReader<'a> {
    base: ReaderBase<'a>,
    bytes_remaining: u64,
}

impl<'a> FixedLengthReader<'a> {
    pub(crate) fn new(conn: &'a mut HttpConnection, cache: Option<Box<dyn CacheSink>>, length: u64) -> Self {
        let mut reader = Self {
            base: ReaderBase::new(conn, cache),
            bytes_remaining: length,
        };
        if length == 0 {
            reader.base.end_of_input();
        }
        reader
    }

    pub fn bytes_remaining(&self) -> u64 {
        self.bytes_remaining
    }

    /// Read body bytes into `buf`. Returns 0 once the declared length was read.
    ///
    /// A stream that ends early fails with [`NetError::ContentLengthMismatch`].
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, NetError> {
        self.base.ensure_open()?;
        if self.bytes_remaining == 0 || buf.is_empty() {
            return Ok(0);
        }

        let max = buf.len().min(usize::try_from(self.bytes_remaining).unwrap_or(usize::MAX));
        let read = match self.base.conn.read_body(&mut buf[..max]).await {
            Ok(0) => return self.base.fail(NetError::ContentLengthMismatch),
            Ok(read) => read,
            Err(e) => return self.base.fail(e),
        };

        self.bytes_remaining -= read as u64;
        self.base.cache_write(&buf[..read]);
        if self.bytes_remaining == 0 {
            self.base.end_of_input();
        }
        Ok(read)
    }

    /// Read and throw away the rest of the body. Returns false if it could not
    /// be exhausted within [`DISCARD_STREAM_TIMEOUT`].
    async fn discard(&mut self) -> bool {
        let drained = async {
            let mut scratch = [0u8; 8192];
            loop {
                match self.read(&mut scratch).await {
                    Ok(0) => return true,
                    Ok(_) => {}
                    Err(_) => return false,
                }
            }
        };
        tokio::time::timeout(DISCARD_STREAM_TIMEOUT, drained).await.unwrap_or(false)
    }

    /// Stop reading. Unread bytes are discarded if that can be done quickly,
    /// otherwise the connection is closed. Idempotent.
    pub async fn close(&mut self) {
        if self.base.closed {
            return;
        }
        if self.bytes_remaining != 0 && !self.discard().await {
            self.base.unexpected_end_of_input(NetError::BodyStreamClosed);
        }
        self.base.closed = true;
    }
}

/// Body sent with chunked transfer coding.
pub struct ChunkedReader<'a> {
    base: ReaderBase<'a>,
    /// `None` until the first chunk header was read.
    bytes_remaining_in_chunk: Option<u64>,
    has_more_chunks: bool,
}

impl<'a> ChunkedReader<'a> {
    pub(crate) fn new(conn: &'a mut HttpConnection, cache: Option<Box<dyn CacheSink>>) -> Self {
        Self {
            base: ReaderBase::new(conn, cache),
            bytes_remaining_in_chunk: None,
            has_more_chunks: true,
        }
    }

    /// Trailers that followed the last chunk, once the body was read to the end.
    pub fn trailers(&self) -> Option<&Headers> {
        self.base.conn.trailers()
    }

    /// Read body bytes into `buf`. Returns 0 after the last chunk.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, NetError> {
        self.base.ensure_open()?;
        if !self.has_more_chunks || buf.is_empty() {
            return Ok(0);
        }

        if matches!(self.bytes_remaining_in_chunk, None | Some(0)) {
            self.read_chunk_size().await?;
            if !self.has_more_chunks {
                return Ok(0);
            }
        }

        let remaining = self.bytes_remaining_in_chunk.unwrap_or(0);
        let max = buf.len().min(usize::try_from(remaining).unwrap_or(usize::MAX));
        let read = match self.base.conn.read_body(&mut buf[..max]).await {
            Ok(0) => return self.base.fail(NetError::IncompleteChunkedEncoding),
            Ok(read) => read,
            Err(e) => return self.base.fail(e),
        };

        self.bytes_remaining_in_chunk = Some(remaining - read as u64);
        self.base.cache_write(&buf[..read]);
        Ok(read)
    }

    async fn read_chunk_size(&mut self) -> Result<(), NetError> {
        // The previous chunk's data is followed by a bare CRLF.
        if self.bytes_remaining_in_chunk.is_some() {
            match self.base.conn.read_line().await {
                Ok(line) if line.is_empty() => {}
                Ok(_) => return self.base.fail(NetError::InvalidChunkedEncoding),
                Err(e) => return self.base.fail(chunk_framing_error(e)),
            }
        }

        let line = match self.base.conn.read_line().await {
            Ok(line) => line,
            Err(e) => return self.base.fail(chunk_framing_error(e)),
        };
        let size = match parse_chunk_size(&line) {
            Some(size) => size,
            None => return self.base.fail(NetError::InvalidChunkedEncoding),
        };
        self.bytes_remaining_in_chunk = Some(size);

        if size == 0 {
            let trailers = match self.base.conn.read_headers().await {
                Ok(trailers) => trailers,
                Err(e) => return self.base.fail(chunk_framing_error(e)),
            };
            self.has_more_chunks = false;
            self.base.conn.set_trailers(trailers);
            self.base.end_of_input();
        }
        Ok(())
    }

    /// Read and throw away the rest of the body. Returns false if it could not
    /// be exhausted within [`DISCARD_STREAM_TIMEOUT`].
    async fn discard(&mut self) -> bool {
        let drained = async {
            let mut scratch = [0u8; 8192];
            loop {
                match self.read(&mut scratch).await {
                    Ok(0) => return true,
                    Ok(_) => {}
                    Err(_) => return false,
                }
            }
        };
        tokio::time::timeout(DISCARD_STREAM_TIMEOUT, drained).await.unwrap_or(false)
    }

    /// Stop reading. Unread chunks are discarded if that can be done quickly,
    /// otherwise the connection is closed. Idempotent.
    pub async fn close(&mut self) {
        if self.base.closed {
            return;
        }
        if self.has_more_chunks && !self.discard().await {
            self.base.unexpected_end_of_input(NetError::BodyStreamClosed);
        }
        self.base.closed = true;
    }
}

/// A stream that ends inside chunk framing is an incomplete body, not a
/// truncated header block.
fn chunk_framing_error(error: NetError) -> NetError {
    match error {
        NetError::ConnectionClosed | NetError::ResponseHeadersTruncated => NetError::IncompleteChunkedEncoding,
        other => other,
    }
}

/// Parse a chunk-size line: hex digits, optionally followed by `;extensions`.
fn parse_chunk_size(line: &str) -> Option<u64> {
    let digits = match line.find(';') {
        Some(index) => &line[..index],
        None => line,
    }
    .trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u64::from_str_radix(digits, 16).ok()
}

/// Body delimited by the end of the stream. The connection cannot be reused.
pub struct UnknownLengthReader<'a> {
    base: ReaderBase<'a>,
    input_exhausted: bool,
}

impl<'a> UnknownLengthReader<'a> {
    pub(crate) fn new(conn: &'a mut HttpConnection, cache: Option<Box<dyn CacheSink>>) -> Self {
        Self {
            base: ReaderBase::new(conn, cache),
            input_exhausted: false,
        }
    }

    /// Read body bytes into `buf`. Returns 0 once the peer ended the stream.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, NetError> {
        self.base.ensure_open()?;
        if self.input_exhausted || buf.is_empty() {
            return Ok(0);
        }

        let read = match self.base.conn.read_body(buf).await {
            Ok(read) => read,
            Err(e) => return self.base.fail(e),
        };
        if read == 0 {
            self.input_exhausted = true;
            self.base.end_of_input();
            return Ok(0);
        }
        self.base.cache_write(&buf[..read]);
        Ok(read)
    }

    /// Stop reading. An unfinished body cannot be skipped; the connection is
    /// closed. Idempotent.
    pub async fn close(&mut self) {
        if self.base.closed {
            return;
        }
        if !self.input_exhausted {
            self.base.unexpected_end_of_input(NetError::BodyStreamClosed);
        }
        self.base.closed = true;
    }
}
