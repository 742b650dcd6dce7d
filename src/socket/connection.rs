//! Physical connections.
//!
//! A [`Connection`] owns one byte channel bound to a [`Route`]. It is shared as
//! `Arc<Connection>` between the pool and whoever is using it. Its byte stream
//! is checked out by the HTTP/1.1 engine for the length of an exchange and
//! checked back in when the exchange completes.

use crate::base::neterror::NetError;
use crate::socket::address::{Address, Protocol, Route};
use crate::socket::client::StreamSocket;
use crate::socket::stream::BoxedSocket;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::io::BufReader;

/// Buffered byte channel of a connection. The read buffer travels with the
/// stream so no bytes are lost between exchanges.
pub type ConnectionStream = BufReader<BoxedSocket>;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

struct Inner {
    stream: Option<ConnectionStream>,
    closed: bool,
    /// The peer half-closed the channel; no further exchange can use it.
    eof: bool,
}

pub struct Connection {
    id: u64,
    route: Route,
    protocol: Protocol,
    inner: Mutex<Inner>,
}

impl Connection {
    /// Wrap an established byte channel.
    pub fn new<S: StreamSocket>(route: Route, protocol: Protocol, socket: S) -> Self {
        Self {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            route,
            protocol,
            inner: Mutex::new(Inner {
                stream: Some(BufReader::new(BoxedSocket::new(socket))),
                closed: false,
                eof: false,
            }),
        }
    }

    /// Process-unique identifier, used for logging and identity checks.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn address(&self) -> &Address {
        self.route.address()
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Multiplexed connections may serve many exchanges at once and stay
    /// pooled while in use.
    pub fn is_shareable(&self) -> bool {
        self.protocol.is_shareable()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether this connection can carry another exchange.
    ///
    /// Exclusive connections whose stream is parked here are probed: unread
    /// buffered bytes or unsolicited data mean the framing is out of sync.
    /// Multiplexed connections report failure through [`Connection::close`].
    pub fn is_alive(&self) -> bool {
        let inner = self.lock();
        if inner.closed || inner.eof {
            return false;
        }
        if self.is_shareable() {
            return true;
        }
        match &inner.stream {
            Some(stream) => stream.buffer().is_empty() && stream.get_ref().is_connected_and_idle(),
            // Checked out by an in-flight exchange.
            None => true,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Close the underlying channel. Idempotent.
    pub fn close(&self) {
        let stream = {
            let mut inner = self.lock();
            if inner.closed {
                return;
            }
            inner.closed = true;
            inner.stream.take()
        };
        tracing::debug!(conn = self.id, protocol = %self.protocol, "connection closed");
        drop(stream);
    }

    /// Check out the byte stream for an exchange.
    pub(crate) fn take_stream(&self) -> Result<ConnectionStream, NetError> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(NetError::SocketNotConnected);
        }
        inner.stream.take().ok_or(NetError::SocketNotConnected)
    }

    /// Check the byte stream back in. A closed connection drops it instead.
    pub(crate) fn restore_stream(&self, stream: ConnectionStream) {
        let mut inner = self.lock();
        if !inner.closed {
            inner.stream = Some(stream);
        }
    }

    /// Record that the peer ended the byte stream.
    pub(crate) fn mark_eof(&self) {
        self.lock().eof = true;
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("protocol", &self.protocol)
            .field("socket_addr", &self.route.socket_addr())
            .finish_non_exhaustive()
    }
}
