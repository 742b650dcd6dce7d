//! Destination identity and routes.
//!
//! The pool keys idle connections on [`Address`] only. A [`Route`] adds the
//! concrete proxy and resolved endpoint a connection was dialed over, so many
//! routes (different IPs, different proxies) can share one address.

use crate::base::neterror::NetError;
use std::fmt;
use std::net::SocketAddr;
use url::Url;

/// Wire protocol spoken on a physical connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Http10,
    Http11,
    Spdy3,
    Http2,
}

impl Protocol {
    /// True for multiplexed protocols whose connections stay pooled while in use.
    pub fn is_shareable(self) -> bool {
        matches!(self, Protocol::Spdy3 | Protocol::Http2)
    }

    /// ALPN identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Http10 => "http/1.0",
            Protocol::Http11 => "http/1.1",
            Protocol::Spdy3 => "spdy/3.1",
            Protocol::Http2 => "h2",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// TLS parameters that distinguish otherwise identical destinations.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TlsIdentity {
    /// SNI / certificate hostname.
    pub server_name: String,
    /// Whether the hostname is verified against the peer certificate.
    pub verify_hostname: bool,
}

impl TlsIdentity {
    pub fn new(server_name: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
            verify_hostname: true,
        }
    }
}

/// Destination identity: the pool's lookup key.
///
/// Two addresses are equal only if every field matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    host: String,
    port: u16,
    tls: Option<TlsIdentity>,
    protocols: Vec<Protocol>,
}

impl Address {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        tls: Option<TlsIdentity>,
        protocols: Vec<Protocol>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            tls,
            protocols,
        }
    }

    /// Build an address from an `http` or `https` URL.
    ///
    /// `https` URLs get a [`TlsIdentity`] for the host and offer HTTP/2 before
    /// HTTP/1.1; `http` URLs only offer HTTP/1.1.
    pub fn from_url(url: &Url) -> Result<Self, NetError> {
        let host = url.host_str().ok_or(NetError::InvalidUrl)?;
        let port = url.port_or_known_default().ok_or(NetError::InvalidUrl)?;
        match url.scheme() {
            "http" => Ok(Self::new(host, port, None, vec![Protocol::Http11])),
            "https" => Ok(Self::new(
                host,
                port,
                Some(TlsIdentity::new(host)),
                vec![Protocol::Http2, Protocol::Http11],
            )),
            _ => Err(NetError::InvalidUrl),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn tls(&self) -> Option<&TlsIdentity> {
        self.tls.as_ref()
    }

    pub fn protocols(&self) -> &[Protocol] {
        &self.protocols
    }
}

/// How a route reaches its destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProxyChoice {
    #[default]
    Direct,
    Http(SocketAddr),
    Socks(SocketAddr),
}

/// A concrete path to an [`Address`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route {
    address: Address,
    proxy: ProxyChoice,
    socket_addr: SocketAddr,
    tls: bool,
}

impl Route {
    pub fn new(address: Address, proxy: ProxyChoice, socket_addr: SocketAddr, tls: bool) -> Self {
        Self {
            address,
            proxy,
            socket_addr,
            tls,
        }
    }

    /// A route with no proxy, using TLS iff the address carries TLS parameters.
    pub fn direct(address: Address, socket_addr: SocketAddr) -> Self {
        let tls = address.tls().is_some();
        Self::new(address, ProxyChoice::Direct, socket_addr, tls)
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn proxy(&self) -> ProxyChoice {
        self.proxy
    }

    pub fn socket_addr(&self) -> SocketAddr {
        self.socket_addr
    }

    pub fn is_tls(&self) -> bool {
        self.tls
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_from_http_url() {
        let url = Url::parse("http://example.com/path").unwrap();
        let address = Address::from_url(&url).unwrap();
        assert_eq!(address.host(), "example.com");
        assert_eq!(address.port(), 80);
        assert!(address.tls().is_none());
        assert_eq!(address.protocols(), &[Protocol::Http11]);
    }

    #[test]
    fn test_address_from_https_url() {
        let url = Url::parse("https://example.com:8443/").unwrap();
        let address = Address::from_url(&url).unwrap();
        assert_eq!(address.port(), 8443);
        assert_eq!(address.tls().unwrap().server_name, "example.com");
    }

    #[test]
    fn test_unsupported_scheme() {
        let url = Url::parse("ftp://example.com/").unwrap();
        assert_eq!(Address::from_url(&url), Err(NetError::InvalidUrl));
    }

    #[test]
    fn test_address_equality_covers_all_fields() {
        let a = Address::new("example.com", 443, None, vec![Protocol::Http11]);
        let b = Address::new("example.com", 443, Some(TlsIdentity::new("example.com")), vec![
            Protocol::Http11,
        ]);
        let c = Address::new("example.com", 443, None, vec![Protocol::Http2, Protocol::Http11]);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_routes_share_an_address() {
        let address = Address::new("example.com", 80, None, vec![Protocol::Http11]);
        let r1 = Route::direct(address.clone(), "10.0.0.1:80".parse().unwrap());
        let r2 = Route::direct(address.clone(), "10.0.0.2:80".parse().unwrap());
        assert_ne!(r1, r2);
        assert_eq!(r1.address(), r2.address());
        assert!(!r1.is_tls());
    }

    #[test]
    fn test_shareable_protocols() {
        assert!(Protocol::Http2.is_shareable());
        assert!(Protocol::Spdy3.is_shareable());
        assert!(!Protocol::Http11.is_shareable());
        assert!(!Protocol::Http10.is_shareable());
    }
}
