//! Socket and connection management.
//!
//! Provides connection pooling and socket handling mirroring Chromium's `net/socket/`:
//! - [`address`]: Destination identity (pool key) and routes
//! - [`connection`]: Physical connections with liveness and protocol capability
//! - [`pool`]: Keep-alive pool bounded by idle count and age
//! - [`connectjob`]: TCP dialing of a route

pub mod address;
pub mod client;
pub mod connection;
pub mod connectjob;
pub mod pool;
pub mod stream;

pub use address::{Address, Protocol, ProxyChoice, Route, TlsIdentity};
pub use connection::Connection;
pub use pool::{ConnectionPool, PoolConfig};
