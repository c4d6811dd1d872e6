//! Per-route connection pool.
//!
//! Admission is two-tiered: reuse an idle connection, else open a new one
//! while under `max_connections_per_route`, else queue the request while
//! under `max_queued_requests_per_route`, else refuse it. Every release tries
//! to serve the head of the queue, so no idle connection sits unused while
//! requests wait.
//!
//! `connections_in_use` counts every connection that has not been retired,
//! whether it is leased or idle in `available`. A persistent connection
//! returned to the pool therefore stays counted; only retiring a
//! non-persistent connection gives its slot back.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, warn};

use crate::config::Config;
use crate::connection::{Connection, Throttle};
use crate::correlation::CorrelationRegistry;
use crate::metrics;
use crate::route::Route;
use crate::signal::CloseAction;
use crate::transport::{Transport, service_unavailable};

/// A connection handed to a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Assignment {
    pub connection: u64,
    /// The connection was opened for this request rather than reused.
    pub opened: bool,
}

/// Outcome of [`ConnectionPool::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Acquired {
    Leased(Assignment),
    Queued,
    Rejected,
}

/// Outcome of [`ConnectionPool::release`].
#[derive(Debug, Default)]
pub(crate) struct Released {
    /// The connection record was dropped from the pool.
    pub closed: bool,
    /// A queued request (accept stream id) that now owns a connection.
    pub next: Option<(u64, Assignment)>,
}

/// The set of connections to one destination route.
#[derive(Debug)]
pub struct ConnectionPool {
    route: Route,
    max_connections: usize,
    max_queued: usize,
    connections: HashMap<u64, Connection>,
    available: VecDeque<u64>,
    queued: VecDeque<u64>,
    connections_in_use: usize,
}

impl ConnectionPool {
    pub(crate) fn new(route: Route, config: &Config) -> Self {
        Self {
            route,
            max_connections: config.max_connections_per_route,
            max_queued: config.max_queued_requests_per_route,
            connections: HashMap::new(),
            available: VecDeque::with_capacity(config.max_connections_per_route),
            queued: VecDeque::new(),
            connections_in_use: 0,
        }
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    /// Connections counted against the route limit, idle ones included.
    pub fn connections_in_use(&self) -> usize {
        self.connections_in_use
    }

    /// Idle connections, in the order they will be reused.
    pub fn available(&self) -> impl Iterator<Item = u64> + '_ {
        self.available.iter().copied()
    }

    /// Queued requests (accept stream ids), oldest first.
    pub fn queued(&self) -> impl Iterator<Item = u64> + '_ {
        self.queued.iter().copied()
    }

    pub fn queued_len(&self) -> usize {
        self.queued.len()
    }

    pub fn connection(&self, id: u64) -> Option<&Connection> {
        self.connections.get(&id)
    }

    pub(crate) fn connection_mut(&mut self, id: u64) -> Option<&mut Connection> {
        self.connections.get_mut(&id)
    }

    /// Serve `request` now, or queue it. `Rejected` means neither was possible.
    pub(crate) fn acquire<T: Transport>(
        &mut self,
        request: u64,
        trace: u64,
        transport: &mut T,
    ) -> Acquired {
        if let Some(assignment) = self.next_connection(trace, transport) {
            return Acquired::Leased(assignment);
        }
        if self.queued.len() < self.max_queued {
            self.queued.push_back(request);
            metrics::ENQUEUES.increment();
            debug!(route = %self.route, request, depth = self.queued.len(), "request queued");
            return Acquired::Queued;
        }
        Acquired::Rejected
    }

    /// Remove a still-queued request. Returns whether it was queued.
    pub(crate) fn cancel(&mut self, request: u64) -> bool {
        match self.queued.iter().position(|&r| r == request) {
            Some(pos) => {
                self.queued.remove(pos);
                metrics::DEQUEUES.increment();
                debug!(route = %self.route, request, "queued request cancelled");
                true
            }
            None => false,
        }
    }

    /// End a lease.
    ///
    /// A response that never started is answered with a 503. Persistent
    /// connections go back to `available`; others are retired once, and
    /// `action` is sent on them unless a termination already was. Then the
    /// head of the queue is served if a connection is free.
    ///
    /// Releasing a persistent connection that is already idle does nothing.
    pub(crate) fn release<T: Transport, C: CorrelationRegistry>(
        &mut self,
        id: u64,
        action: Option<CloseAction>,
        trace: u64,
        transport: &mut T,
        correlations: &mut C,
    ) -> Released {
        let Some(connection) = self.connections.get_mut(&id) else {
            return Released::default();
        };
        if connection.persistent && !connection.leased {
            debug!(route = %self.route, connection = id, "connection already idle");
            return Released::default();
        }

        if let Some(correlation) = correlations.remove(connection.correlation_id()) {
            metrics::REQUESTS_ABANDONED.increment();
            metrics::RESPONSES.increment();
            warn!(
                route = %self.route,
                connection = id,
                reply_to = %correlation.reply_to,
                "connection released before a response began, answering 503"
            );
            transport.send_response(
                &correlation.reply_to,
                correlation.accept_correlation_id,
                &service_unavailable(),
            );
        }

        connection.throttle = Throttle::Default;
        connection.leased = false;
        let mut closed = false;
        if connection.persistent {
            if !self.available.contains(&id) {
                self.available.push_back(id);
            }
        } else {
            if !connection.released {
                connection.released = true;
                debug_assert!(self.connections_in_use > 0);
                self.connections_in_use = self.connections_in_use.saturating_sub(1);
                metrics::CONNECTIONS_IN_USE.decrement();
            }
            self.available.retain(|&c| c != id);

            if let Some(action) = action
                && !connection.end_or_abort_sent
            {
                match action {
                    CloseAction::End => transport.signal_end(connection.stream_id(), trace),
                    CloseAction::Abort => transport.signal_abort(connection.stream_id(), trace),
                }
                connection.end_or_abort_sent = true;
            }

            if connection.is_finished() {
                self.connections.remove(&id);
                closed = true;
            }
            debug!(route = %self.route, connection = id, closed, "connection retired");
        }

        Released {
            closed,
            next: self.acquire_next_if_queued(trace, transport),
        }
    }

    /// Hand throttle signals for `id` back to the connection itself.
    pub(crate) fn set_default_throttle(&mut self, id: u64) {
        if let Some(connection) = self.connections.get_mut(&id) {
            connection.throttle = Throttle::Default;
        }
    }

    fn acquire_next_if_queued<T: Transport>(
        &mut self,
        trace: u64,
        transport: &mut T,
    ) -> Option<(u64, Assignment)> {
        if self.queued.is_empty() {
            return None;
        }
        let assignment = self.next_connection(trace, transport)?;
        let request = self.queued.pop_front()?;
        metrics::DEQUEUES.increment();
        debug!(
            route = %self.route,
            request,
            connection = assignment.connection,
            "queued request served"
        );
        Some((request, assignment))
    }

    /// Reuse the oldest idle connection or open one if under the limit.
    fn next_connection<T: Transport>(
        &mut self,
        trace: u64,
        transport: &mut T,
    ) -> Option<Assignment> {
        let assignment = match self.available.pop_front() {
            Some(connection) => Assignment {
                connection,
                opened: false,
            },
            None if self.connections_in_use < self.max_connections => Assignment {
                connection: self.open(trace, transport),
                opened: true,
            },
            None => return None,
        };
        if let Some(connection) = self.connections.get_mut(&assignment.connection) {
            connection.leased = true;
            connection.requests += 1;
        }
        Some(assignment)
    }

    fn open<T: Transport>(&mut self, trace: u64, transport: &mut T) -> u64 {
        let opened = transport.open_connection(&self.route, trace);
        self.connections.insert(
            opened.stream_id,
            Connection::new(opened.stream_id, opened.correlation_id),
        );
        self.connections_in_use += 1;
        metrics::CONNECTIONS_IN_USE.increment();
        debug!(
            route = %self.route,
            connection = opened.stream_id,
            in_use = self.connections_in_use,
            "connection opened"
        );
        opened.stream_id
    }
}
