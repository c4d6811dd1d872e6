//! One pooled outbound connection.

use crate::budget::Budget;

/// Who receives throttle signals for a connection's connect stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Throttle {
    /// The connection's own handler: windows top up the budget, a reset
    /// retires the connection.
    Default,
    /// A request stream (by accept stream id) is writing its request.
    Request(u64),
}

/// State of one outbound connect stream owned by a
/// [`ConnectionPool`](crate::ConnectionPool).
#[derive(Debug)]
pub struct Connection {
    stream_id: u64,
    correlation_id: u64,
    pub(crate) budget: Budget,
    pub(crate) persistent: bool,
    /// Handed to a request and not yet given back.
    pub(crate) leased: bool,
    pub(crate) released: bool,
    pub(crate) end_or_abort_sent: bool,
    pub(crate) reset_received: bool,
    pub(crate) requests: u32,
    pub(crate) throttle: Throttle,
    /// Paired connect-reply stream, once the response side has attached.
    pub(crate) reply_stream: Option<u64>,
}

impl Connection {
    pub(crate) fn new(stream_id: u64, correlation_id: u64) -> Self {
        Self {
            stream_id,
            correlation_id,
            budget: Budget::new(),
            persistent: true,
            leased: false,
            released: false,
            end_or_abort_sent: false,
            reset_received: false,
            requests: 0,
            throttle: Throttle::Default,
            reply_stream: None,
        }
    }

    /// Connect stream id.
    pub fn stream_id(&self) -> u64 {
        self.stream_id
    }

    /// Outbound correlation id, the key of this connection's registry entry.
    pub fn correlation_id(&self) -> u64 {
        self.correlation_id
    }

    pub fn budget(&self) -> &Budget {
        &self.budget
    }

    /// Whether the connection may serve another request after this one.
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    /// Whether a request holds the connection right now.
    pub fn is_leased(&self) -> bool {
        self.leased
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Requests served over this connection so far.
    pub fn requests(&self) -> u32 {
        self.requests
    }

    pub fn throttle(&self) -> Throttle {
        self.throttle
    }

    /// Mark the connection as refused by the destination. It will not be
    /// reused and needs no End/Abort of its own.
    pub(crate) fn mark_reset(&mut self) {
        self.persistent = false;
        self.reset_received = true;
    }

    /// Whether nothing more will ever be sent or received on this connection.
    pub(crate) fn is_finished(&self) -> bool {
        self.released && (self.end_or_abort_sent || self.reset_received)
    }
}
