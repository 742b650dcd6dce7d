use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use crate::socket::address::{Protocol, ProxyChoice, Route};
use crate::socket::connection::Connection;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;

/// Dials a route into a [`Connection`].
/// Roughly equivalent to net::ConnectJob, limited to direct plaintext routes.
pub struct ConnectJob;

impl ConnectJob {
    /// TCP connect to the route's resolved endpoint, bounded by `timeout`.
    ///
    /// The connection speaks HTTP/1.1; TLS and proxy tunnels are dialed by
    /// other layers and wrapped with [`Connection::new`].
    pub async fn connect(route: &Route, timeout: Duration) -> Result<Arc<Connection>, NetError> {
        if route.is_tls() || route.proxy() != ProxyChoice::Direct {
            return Err(NetError::InvalidArgument);
        }

        let addr = route.socket_addr();
        let host = route.address().host();
        tracing::debug!(host = %host, addr = %addr, "connecting");

        let stream = tokio::time::timeout(timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| NetError::ConnectionTimedOut)?
            .connect_context(host, addr.port())?;
        stream.set_nodelay(true).connect_context(host, addr.port())?;

        Ok(Arc::new(Connection::new(route.clone(), Protocol::Http11, stream)))
    }
}
