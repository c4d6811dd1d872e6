//! Sans-IO HTTP/1.1 request head encoding.
//!
//! Turns an HTTP/2-style header list (pseudo-fields plus regular headers)
//! into the raw bytes of an HTTP/1.1 request head, and reports whether the
//! connection carrying it may be reused afterwards. There is no I/O and no
//! state: the caller owns the buffer and decides when to write it.
//!
//! # Example
//!
//! ```rust
//! use ringline_h1::{HeaderField, encode_request};
//!
//! let encoded = encode_request(&[
//!     HeaderField::new(":method", "GET"),
//!     HeaderField::new(":scheme", "http"),
//!     HeaderField::new(":path", "/index.html"),
//!     HeaderField::new(":authority", "example.com"),
//!     HeaderField::new("user-agent", "ringline"),
//! ])
//! .unwrap();
//!
//! assert_eq!(
//!     encoded.bytes,
//!     b"GET /index.html HTTP/1.1\r\nHost: example.com\r\nUser-Agent: ringline\r\n\r\n"
//! );
//! assert!(encoded.persistent);
//! ```

pub mod encode;
pub mod error;
pub mod header;

pub use encode::{EncodedRequest, encode_request, is_non_idempotent, requests_close};
pub use error::EncodeError;
pub use header::{HeaderField, train_case};
