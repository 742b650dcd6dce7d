use std::io::ErrorKind;
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tokio::net::TcpStream;

/// Represents a connected byte channel (TCP, TLS, or an in-memory pipe).
/// Mimics net::StreamSocket.
pub trait StreamSocket: AsyncRead + AsyncWrite + Unpin + Send + Sync + 'static {
    /// Returns true if the socket is still connected.
    /// Note: This does a non-blocking check, not a full liveness probe.
    fn is_connected(&self) -> bool {
        true
    }

    /// Returns true if the socket is connected and has no pending data.
    /// Matches Chromium's IsConnectedAndIdle().
    fn is_connected_and_idle(&self) -> bool {
        self.is_connected()
    }
}

/// Non-blocking probe of a TCP socket.
/// Returns `(connected, idle)`.
fn probe_tcp(stream: &TcpStream) -> (bool, bool) {
    // peer_addr() returns Err if socket is disconnected
    if stream.peer_addr().is_err() {
        return (false, false);
    }

    // This catches RST and FIN conditions
    let mut buf = [0u8; 1];
    match stream.try_read(&mut buf) {
        Ok(0) => (false, false),                                      // EOF - connection closed
        Ok(_) => (true, false), // Data on an idle socket; the byte is consumed
        Err(ref e) if e.kind() == ErrorKind::WouldBlock => (true, true), // No data, but connected
        Err(_) => (false, false),
    }
}

impl StreamSocket for TcpStream {
    fn is_connected(&self) -> bool {
        probe_tcp(self).0
    }

    fn is_connected_and_idle(&self) -> bool {
        let (connected, idle) = probe_tcp(self);
        connected && idle
    }
}

// In-memory pipes have no liveness signal of their own.
impl StreamSocket for DuplexStream {}
