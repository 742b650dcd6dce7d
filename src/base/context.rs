//! Ergonomic error context helpers.
//!
//! Provides extension traits for adding context to `Result` types,
//! converting IO errors from the byte channel into `NetError` variants.

use crate::base::neterror::NetError;
use std::io;

/// Extension trait for adding context to IO Results.
pub trait IoResultExt<T> {
    /// Convert an IO error on a connection's byte channel into a transport error.
    ///
    /// # Example
    /// ```ignore
    /// use reusenet::base::context::IoResultExt;
    ///
    /// stream.write_all(b"GET / HTTP/1.1\r\n\r\n").await
    ///     .transport_context(conn.id())?;
    /// ```
    fn transport_context(self, connection_id: u64) -> Result<T, NetError>;

    /// Convert an IO error raised while dialing `host:port`.
    fn connect_context(self, host: &str, port: u16) -> Result<T, NetError>;
}

impl<T> IoResultExt<T> for Result<T, io::Error> {
    fn transport_context(self, connection_id: u64) -> Result<T, NetError> {
        self.map_err(|e| {
            tracing::debug!(conn = connection_id, error = %e, "transport error");
            NetError::from_io(&e)
        })
    }

    fn connect_context(self, host: &str, port: u16) -> Result<T, NetError> {
        self.map_err(|e| {
            tracing::debug!(host = %host, port, error = %e, "connect failed");
            match NetError::from_io(&e) {
                NetError::ConnectionRefused => NetError::ConnectionRefused,
                NetError::ConnectionTimedOut => NetError::ConnectionTimedOut,
                NetError::AddressInvalid => NetError::AddressInvalid,
                _ => NetError::ConnectionFailed,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_transport_context() {
        let result: Result<(), io::Error> = Err(Error::new(ErrorKind::ConnectionReset, "reset"));
        let err = result.transport_context(7).unwrap_err();
        assert_eq!(err, NetError::ConnectionReset);
        assert!(err.is_transport_error());
    }

    #[test]
    fn test_unexpected_eof_is_connection_closed() {
        let result: Result<(), io::Error> = Err(Error::new(ErrorKind::UnexpectedEof, "eof"));
        assert_eq!(result.transport_context(1).unwrap_err(), NetError::ConnectionClosed);
    }

    #[test]
    fn test_connect_context() {
        let result: Result<(), io::Error> =
            Err(Error::new(ErrorKind::ConnectionRefused, "refused"));
        let err = result.connect_context("example.com", 443).unwrap_err();
        assert_eq!(err, NetError::ConnectionRefused);

        let result: Result<(), io::Error> = Err(Error::new(ErrorKind::Other, "weird"));
        let err = result.connect_context("example.com", 443).unwrap_err();
        assert_eq!(err, NetError::ConnectionFailed);
    }
}
