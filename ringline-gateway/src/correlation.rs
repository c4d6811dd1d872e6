//! Correlation of outbound requests with the caller awaiting their response.

use std::collections::HashMap;

use crate::route::Route;

/// Where a response for a leased connection has to go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correlation {
    /// Correlation id of the caller's accept stream.
    pub accept_correlation_id: u64,
    /// Name of the caller's reply target.
    pub reply_to: String,
    /// Route of the pool that owns the connection.
    pub route: Route,
    /// Connect stream id of the leased connection.
    pub connection: u64,
}

/// Map from outbound correlation id to [`Correlation`].
///
/// An entry is put when a connection is leased and removed exactly once:
/// by the response router when the response begins, or by the pool when the
/// connection is released before any response started.
pub trait CorrelationRegistry {
    fn put(&mut self, id: u64, correlation: Correlation);

    /// Remove and return the entry. `None` means someone else already did.
    fn remove(&mut self, id: u64) -> Option<Correlation>;

    fn contains(&self, id: u64) -> bool;
}

impl CorrelationRegistry for HashMap<u64, Correlation> {
    fn put(&mut self, id: u64, correlation: Correlation) {
        self.insert(id, correlation);
    }

    fn remove(&mut self, id: u64) -> Option<Correlation> {
        HashMap::remove(self, &id)
    }

    fn contains(&self, id: u64) -> bool {
        self.contains_key(&id)
    }
}
