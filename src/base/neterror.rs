use crate::http::connection::State;
use std::io;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum NetError {
    // Connection Errors
    #[error("Connection closed (TCP FIN)")]
    ConnectionClosed,
    #[error("Connection reset (TCP RST)")]
    ConnectionReset,
    #[error("Connection refused")]
    ConnectionRefused,
    #[error("Connection aborted")]
    ConnectionAborted,
    #[error("Connection failed")]
    ConnectionFailed,
    #[error("Address invalid")]
    AddressInvalid,
    #[error("Socket not connected")]
    SocketNotConnected,
    #[error("Connection timed out")]
    ConnectionTimedOut,

    // HTTP Errors
    #[error("Invalid URL")]
    InvalidUrl,
    #[error("Invalid chunked encoding")]
    InvalidChunkedEncoding,
    #[error("Response headers too big")]
    ResponseHeadersTooBig,
    #[error("Content-Length mismatch")]
    ContentLengthMismatch,
    #[error("Incomplete chunked encoding")]
    IncompleteChunkedEncoding,
    #[error("Response headers truncated")]
    ResponseHeadersTruncated,
    #[error("Invalid HTTP response")]
    InvalidHttpResponse,

    // Usage and body errors (custom codes starting at -910)
    #[error("Invalid header")]
    InvalidHeader,
    #[error("Invalid argument")]
    InvalidArgument,
    #[error("Operation not permitted in state {0:?}")]
    IllegalState(State),
    #[error("Body stream already closed")]
    BodyStreamClosed,
    #[error("Expected {expected} bytes but received {received}")]
    RequestBodyOverflow { expected: u64, received: u64 },

    #[error("Unknown error: {0}")]
    Unknown(i32),
}

impl NetError {
    pub fn as_i32(&self) -> i32 {
        match self {
            NetError::ConnectionClosed => -100,
            NetError::ConnectionReset => -101,
            NetError::ConnectionRefused => -102,
            NetError::ConnectionAborted => -103,
            NetError::ConnectionFailed => -104,
            NetError::AddressInvalid => -108,
            NetError::SocketNotConnected => -112,
            NetError::ConnectionTimedOut => -118,

            NetError::InvalidUrl => -300,
            NetError::InvalidChunkedEncoding => -321,
            NetError::ResponseHeadersTooBig => -325,
            NetError::ContentLengthMismatch => -354,
            NetError::IncompleteChunkedEncoding => -355,
            NetError::ResponseHeadersTruncated => -357,
            NetError::InvalidHttpResponse => -370,

            NetError::InvalidHeader => -910,
            NetError::InvalidArgument => -911,
            NetError::IllegalState(_) => -912,
            NetError::BodyStreamClosed => -913,
            NetError::RequestBodyOverflow { .. } => -914,
            NetError::Unknown(code) => *code,
        }
    }

    /// Maps an I/O failure on the byte channel to a transport error.
    pub fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => NetError::ConnectionClosed,
            io::ErrorKind::ConnectionReset => NetError::ConnectionReset,
            io::ErrorKind::ConnectionRefused => NetError::ConnectionRefused,
            io::ErrorKind::ConnectionAborted | io::ErrorKind::BrokenPipe => {
                NetError::ConnectionAborted
            }
            io::ErrorKind::NotConnected => NetError::SocketNotConnected,
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => NetError::ConnectionTimedOut,
            io::ErrorKind::AddrNotAvailable | io::ErrorKind::InvalidInput => {
                NetError::AddressInvalid
            }
            _ => NetError::ConnectionFailed,
        }
    }

    /// Body length contract violations and malformed framing from the peer.
    pub fn is_framing_error(&self) -> bool {
        matches!(
            self,
            NetError::ContentLengthMismatch
                | NetError::RequestBodyOverflow { .. }
                | NetError::InvalidChunkedEncoding
                | NetError::IncompleteChunkedEncoding
                | NetError::InvalidHttpResponse
                | NetError::ResponseHeadersTooBig
                | NetError::ResponseHeadersTruncated
        )
    }

    /// Failures of the underlying byte channel itself.
    pub fn is_transport_error(&self) -> bool {
        matches!(
            self,
            NetError::ConnectionClosed
                | NetError::ConnectionReset
                | NetError::ConnectionRefused
                | NetError::ConnectionAborted
                | NetError::ConnectionFailed
                | NetError::ConnectionTimedOut
                | NetError::SocketNotConnected
                | NetError::AddressInvalid
        )
    }

    /// Programmer errors: calling an operation out of order or with a bad argument.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            NetError::IllegalState(_) | NetError::InvalidArgument | NetError::BodyStreamClosed
        )
    }
}

impl From<io::Error> for NetError {
    fn from(err: io::Error) -> Self {
        NetError::from_io(&err)
    }
}

impl From<i32> for NetError {
    /// Variants that carry data (`IllegalState`, `RequestBodyOverflow`) are
    /// not reconstructed from their code.
    fn from(code: i32) -> Self {
        match code {
            -100 => NetError::ConnectionClosed,
            -101 => NetError::ConnectionReset,
            -102 => NetError::ConnectionRefused,
            -103 => NetError::ConnectionAborted,
            -104 => NetError::ConnectionFailed,
            -108 => NetError::AddressInvalid,
            -112 => NetError::SocketNotConnected,
            -118 => NetError::ConnectionTimedOut,

            -300 => NetError::InvalidUrl,
            -321 => NetError::InvalidChunkedEncoding,
            -325 => NetError::ResponseHeadersTooBig,
            -354 => NetError::ContentLengthMismatch,
            -355 => NetError::IncompleteChunkedEncoding,
            -357 => NetError::ResponseHeadersTruncated,
            -370 => NetError::InvalidHttpResponse,

            -910 => NetError::InvalidHeader,
            -911 => NetError::InvalidArgument,
            -913 => NetError::BodyStreamClosed,
            _ => NetError::Unknown(code),
        }
    }
}
