//! Request body writers.
//!
//! Both writers borrow the engine for their lifetime, so no other exchange
//! step can run until the body is closed or the writer is dropped. Dropping a
//! writer without closing it leaves the request half-sent; the connection is
//! closed.

use crate::base::neterror::NetError;
use crate::http::connection::HttpConnection;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";
const CRLF: &[u8] = b"\r\n";
const FINAL_CHUNK: &[u8] = b"0\r\n\r\n";

/// Encode `size` as lowercase hex followed by CRLF, using `scratch` as the
/// backing buffer. 16 digits cover any `u64`.
fn encode_chunk_size(size: u64, scratch: &mut [u8; 18]) -> &[u8] {
    scratch[16] = b'\r';
    scratch[17] = b'\n';
    let mut cursor = 16;
    let mut remaining = size;
    loop {
        cursor -= 1;
        scratch[cursor] = HEX_DIGITS[(remaining & 0xf) as usize];
        remaining >>= 4;
        if remaining == 0 {
            break;
        }
    }
    &scratch[cursor..]
}

/// Body with a declared `Content-Length`.
///
/// Writing past the declared length fails with
/// [`NetError::RequestBodyOverflow`]; closing short of it fails with
/// [`NetError::ContentLengthMismatch`]. Both close the connection.
pub struct FixedLengthWriter<'a> {
    conn: &'a mut HttpConnection,
    bytes_remaining: u64,
    closed: bool,
}

impl<'a> FixedLengthWriter<'a> {
    pub(crate) fn new(conn: &'a mut HttpConnection, content_length: u64) -> Self {
        Self {
            conn,
            bytes_remaining: content_length,
            closed: false,
        }
    }

    pub fn bytes_remaining(&self) -> u64 {
        self.bytes_remaining
    }

    pub async fn write(&mut self, data: &[u8]) -> Result<(), NetError> {
        if self.closed {
            return Err(NetError::BodyStreamClosed);
        }
        let len = data.len() as u64;
        if len > self.bytes_remaining {
            let error = NetError::RequestBodyOverflow {
                expected: self.bytes_remaining,
                received: len,
            };
            self.closed = true;
            self.conn.abandon(error);
            return Err(error);
        }
        if let Err(e) = self.conn.write_all(data).await {
            self.closed = true;
            return Err(e);
        }
        self.bytes_remaining -= len;
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<(), NetError> {
        if self.closed {
            return Err(NetError::BodyStreamClosed);
        }
        self.conn.flush().await
    }

    /// Finish the body. Idempotent.
    pub async fn close(&mut self) -> Result<(), NetError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if self.bytes_remaining > 0 {
            self.conn.abandon(NetError::ContentLengthMismatch);
            return Err(NetError::ContentLengthMismatch);
        }
        self.conn.request_body_complete();
        Ok(())
    }
}

impl Drop for FixedLengthWriter<'_> {
    fn drop(&mut self) {
        if !self.closed {
            self.conn.abandon(NetError::ContentLengthMismatch);
        }
    }
}

/// Body sent with `Transfer-Encoding: chunked`.
///
/// Each non-empty write becomes one chunk. Closing writes the terminating
/// zero-length chunk.
pub struct ChunkedWriter<'a> {
    conn: &'a mut HttpConnection,
    closed: bool,
}

impl<'a> ChunkedWriter<'a> {
    pub(crate) fn new(conn: &'a mut HttpConnection) -> Self {
        Self {
            conn,
            closed: false,
        }
    }

    pub async fn write(&mut self, data: &[u8]) -> Result<(), NetError> {
        if self.closed {
            return Err(NetError::BodyStreamClosed);
        }
        // A zero-length chunk would terminate the body.
        if data.is_empty() {
            return Ok(());
        }

        let mut scratch = [0u8; 18];
        let header = encode_chunk_size(data.len() as u64, &mut scratch);
        for part in [header, data, CRLF] {
            if let Err(e) = self.conn.write_all(part).await {
                self.closed = true;
                return Err(e);
            }
        }
        Ok(())
    }

    pub async fn flush(&mut self) -> Result<(), NetError> {
        if self.closed {
            return Err(NetError::BodyStreamClosed);
        }
        self.conn.flush().await
    }

    /// Write the final chunk. Idempotent.
    pub async fn close(&mut self) -> Result<(), NetError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.conn.write_all(FINAL_CHUNK).await?;
        self.conn.request_body_complete();
        Ok(())
    }
}

impl Drop for ChunkedWriter<'_> {
    fn drop(&mut self) {
        if !self.closed {
            self.conn.abandon(NetError::IncompleteChunkedEncoding);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(size: u64) -> String {
        let mut scratch = [0u8; 18];
        String::from_utf8(encode_chunk_size(size, &mut scratch).to_vec()).unwrap()
    }

    #[test]
    fn test_chunk_size_encoding() {
        assert_eq!(hex(0), "0\r\n");
        assert_eq!(hex(5), "5\r\n");
        assert_eq!(hex(0x1a), "1a\r\n");
        assert_eq!(hex(4096), "1000\r\n");
        assert_eq!(hex(u64::MAX), "ffffffffffffffff\r\n");
    }
}
