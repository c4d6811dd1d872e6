//! Client side of an HTTP/1.1 stream gateway.
//!
//! Callers open request streams carrying HTTP/2-style header lists and body
//! data under credit flow control. The gateway encodes each request as an
//! HTTP/1.1 head, leases a connection for it from a bounded per-route pool,
//! and writes head and body as the destination grants window. Requests that
//! find no free connection wait in a FIFO queue; when the queue is full they
//! are answered with `503` and `retry-after: 0`.
//!
//! Everything is sans-IO and single-threaded. The driver feeds signals in
//! through [`Gateway::on_stream`] and [`Gateway::on_throttle`]; effects go
//! out through a [`Transport`].
//!
//! # Architecture
//!
//! ```text
//!   caller (accept streams)
//!        |  Begin / Data / End / Abort
//!   +----v-----------+
//!   | RequestStream  |  encode head, pace writes, relay credit
//!   +----+-----------+
//!        |  lease / release
//!   +----v-----------+
//!   | ConnectionPool |  one per Route: idle deque, FIFO queue
//!   +----+-----------+
//!        |  Window / Reset
//!   destination (connect streams)
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::collections::HashMap;
//! use ringline_gateway::{Config, Gateway, HeaderField, Route, StreamInit, StreamSignal};
//!
//! let mut gateway = Gateway::new(Config::default(), transport, HashMap::new())?;
//! gateway.new_stream(StreamInit {
//!     accept_id: 1,
//!     accept_name: "source".into(),
//!     accept_correlation_id: 11,
//!     route: Route::new("target", 1),
//!     headers: vec![
//!         HeaderField::new(":method", "GET"),
//!         HeaderField::new(":scheme", "http"),
//!         HeaderField::new(":path", "/"),
//!         HeaderField::new(":authority", "example.com"),
//!     ],
//! });
//! gateway.on_stream(1, StreamSignal::Begin { trace: 0 });
//! ```

pub mod budget;
pub mod config;
pub mod connection;
pub mod correlation;
pub mod error;
mod gateway;
pub mod metrics;
pub mod pool;
pub mod route;
pub mod signal;
pub mod stream;
pub mod transport;

pub use budget::Budget;
pub use config::Config;
pub use connection::{Connection, Throttle};
pub use correlation::{Correlation, CorrelationRegistry};
pub use error::Error;
pub use gateway::Gateway;
pub use pool::ConnectionPool;
pub use ringline_h1::HeaderField;
pub use route::Route;
pub use signal::{CloseAction, StreamSignal, ThrottleSignal};
pub use stream::{Lease, RequestStream, StreamInit, StreamState};
pub use transport::{OpenedConnection, Transport, service_unavailable};
