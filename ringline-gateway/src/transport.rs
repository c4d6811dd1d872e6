//! The transport the gateway writes to.

use ringline_h1::HeaderField;

use crate::route::Route;

/// Identifiers issued for a freshly opened connect stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenedConnection {
    pub stream_id: u64,
    pub correlation_id: u64,
}

/// Outbound half of the stream transport.
///
/// Every call is fire-and-forget: the gateway never waits on the transport,
/// and results come back later as [`StreamSignal`](crate::StreamSignal)s or
/// [`ThrottleSignal`](crate::ThrottleSignal)s.
pub trait Transport {
    /// Open a new connect stream towards `route`.
    fn open_connection(&mut self, route: &Route, trace: u64) -> OpenedConnection;

    /// Write `payload` on a connect stream.
    fn write(&mut self, stream_id: u64, trace: u64, padding: i32, payload: &[u8]);

    /// Gracefully end a connect stream.
    fn signal_end(&mut self, stream_id: u64, trace: u64);

    /// Abort a connect stream.
    fn signal_abort(&mut self, stream_id: u64, trace: u64);

    /// Grant `credit` bytes to the sender on `stream_id`.
    fn grant_window(&mut self, stream_id: u64, trace: u64, credit: i32, padding: i32);

    /// Reset the sender on `stream_id`.
    fn signal_reset(&mut self, stream_id: u64, trace: u64);

    /// Deliver a body-less response (`:status` plus headers) to the caller
    /// identified by `reply_to` and `correlation_id`.
    fn send_response(&mut self, reply_to: &str, correlation_id: u64, headers: &[HeaderField]);
}

/// `503 Service Unavailable` with `retry-after: 0`.
pub fn service_unavailable() -> [HeaderField; 2] {
    [
        HeaderField::new(":status", "503"),
        HeaderField::new("retry-after", "0"),
    ]
}
