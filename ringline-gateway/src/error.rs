use ringline_h1::EncodeError;

use crate::stream::StreamState;

/// Errors produced by the gateway.
///
/// Everything except [`Error::Config`] is a protocol violation scoped to one
/// accept stream: the gateway resets that stream and carries on.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid configuration value.
    #[error("config: {0}")]
    Config(String),

    /// The header set could not be turned into an HTTP/1.1 request head.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// The encoded request head does not fit in one buffer slot.
    #[error("request head is {size} bytes, slot capacity is {capacity}")]
    HeadersTooLarge { size: usize, capacity: usize },

    /// Data exceeded the credit granted to the caller, or a write would have
    /// overdrawn a connection budget.
    #[error("flow control error")]
    FlowControl,

    /// A signal arrived in a state that does not accept it.
    #[error("unexpected {signal} in state {state:?}")]
    UnexpectedSignal {
        state: StreamState,
        signal: &'static str,
    },

    /// The stream has no connection to write to.
    #[error("no connection leased")]
    NotLeased,

    /// The leased connection no longer exists in its pool.
    #[error("connection {0} is gone")]
    ConnectionGone(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_errors_display() {
        assert_eq!(Error::NotLeased.to_string(), "no connection leased");
        assert_eq!(Error::ConnectionGone(7).to_string(), "connection 7 is gone");
        let err = Error::UnexpectedSignal {
            state: StreamState::BeforeBegin,
            signal: "data",
        };
        assert_eq!(err.to_string(), "unexpected data in state BeforeBegin");
    }
}
