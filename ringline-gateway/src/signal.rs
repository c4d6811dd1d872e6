//! Signals delivered to the gateway by the transport.

use bytes::Bytes;

/// A signal arriving on an accept stream (caller to gateway).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamSignal {
    /// The caller opened the request. Headers were supplied with the stream.
    Begin { trace: u64 },
    /// A chunk of request body.
    Data {
        trace: u64,
        padding: i32,
        payload: Bytes,
    },
    /// The request body is complete.
    End { trace: u64 },
    /// The caller gave up on the request.
    Abort { trace: u64 },
}

impl StreamSignal {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Begin { .. } => "BEGIN",
            Self::Data { .. } => "DATA",
            Self::End { .. } => "END",
            Self::Abort { .. } => "ABORT",
        }
    }

    pub fn trace(&self) -> u64 {
        match self {
            Self::Begin { trace }
            | Self::Data { trace, .. }
            | Self::End { trace }
            | Self::Abort { trace } => *trace,
        }
    }
}

/// A flow-control signal arriving on a connect stream (destination to gateway).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleSignal {
    /// Permission to write `credit` more bytes, each write costing `padding`
    /// bytes of overhead.
    Window { trace: u64, credit: i32, padding: i32 },
    /// The destination refused the stream.
    Reset { trace: u64 },
}

/// Termination to send on a connection that is not going back to the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseAction {
    End,
    Abort,
}
