//! # reusenet
//!
//! Client-side HTTP connection reuse: a keep-alive connection pool and an
//! HTTP/1.1 exchange engine that returns connections to it.
//!
//! ## Features
//!
//! - **Connection Pooling**: idle limit, keep-alive expiry, LRU eviction
//! - **Multiplexing Aware**: shareable (HTTP/2, SPDY) connections stay pooled while in use
//! - **HTTP/1.1 Framing**: fixed-length, chunked and read-until-close bodies
//! - **Cache Write-Through**: response bodies mirrored into a [`http::CacheSink`]
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use reusenet::http::{Headers, HttpConnection};
//! use reusenet::socket::{Address, ConnectionPool, Route};
//! use reusenet::socket::connectjob::ConnectJob;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), reusenet::base::neterror::NetError> {
//!     let pool = ConnectionPool::global();
//!     let address = Address::from_url(&"http://example.com/".parse().unwrap())?;
//!     let connection = match pool.acquire(&address) {
//!         Some(connection) => connection,
//!         None => {
//!             let route = Route::direct(address, "93.184.216.34:80".parse().unwrap());
//!             ConnectJob::connect(&route, Duration::from_secs(10)).await?
//!         }
//!     };
//!
//!     let mut engine = HttpConnection::new(pool, connection)?;
//!     let mut headers = Headers::new();
//!     headers.add("Host", "example.com")?;
//!     engine.write_request(&headers, "GET / HTTP/1.1").await?;
//!     let head = engine.read_response().await?;
//!
//!     engine.pool_on_idle();
//!     let mut body = engine.open_fixed_length_reader(None, head.content_length().unwrap_or(0))?;
//!     let mut buf = [0u8; 4096];
//!     while body.read(&mut buf).await? != 0 {}
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`base`] - Error codes and error context helpers
//! - [`http`] - HTTP/1.1 exchange engine, body streams, headers and cache sinks
//! - [`socket`] - Addresses, routes, connections, dialing and the pool

pub mod base;
pub mod http;
pub mod socket;
