pub mod bodyreader;
pub mod bodywriter;
pub mod connection;
pub mod headers;
pub mod httpcache;
pub mod requestbody;
pub mod statusline;

// Re-exports for convenience
pub use bodyreader::{ChunkedReader, FixedLengthReader, UnknownLengthReader};
pub use bodywriter::{ChunkedWriter, FixedLengthWriter};
pub use connection::{HttpConnection, OnIdle, ResponseHead, State};
pub use headers::Headers;
pub use httpcache::{CacheKey, CacheSink, HttpCache};
pub use requestbody::RequestBody;
pub use statusline::StatusLine;
