//! Signal dispatcher.
//!
//! [`Gateway`] owns every pool, request stream and correlation, and routes
//! each incoming signal to the state machine that handles it: accept-stream
//! signals go to the [`RequestStream`], connect-stream throttle signals go
//! to whichever handler the [`Connection`](crate::Connection) is currently
//! bound to.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::config::Config;
use crate::connection::Throttle;
use crate::correlation::{Correlation, CorrelationRegistry};
use crate::error::Error;
use crate::pool::ConnectionPool;
use crate::route::Route;
use crate::signal::{CloseAction, StreamSignal, ThrottleSignal};
use crate::stream::{RequestStream, StreamInit};
use crate::transport::Transport;

/// Outbound HTTP/1.1 gateway core.
///
/// Single-threaded and sans-IO: every method runs to completion, emitting
/// its effects through `T` before returning.
pub struct Gateway<T, C = HashMap<u64, Correlation>> {
    pub(crate) config: Config,
    pub(crate) transport: T,
    pub(crate) correlations: C,
    pub(crate) pools: HashMap<Route, ConnectionPool>,
    pub(crate) streams: HashMap<u64, RequestStream>,
    /// Connect stream id to the route of the pool that owns it.
    pub(crate) routes: HashMap<u64, Route>,
}

impl<T: Transport, C: CorrelationRegistry> Gateway<T, C> {
    pub fn new(config: Config, transport: T, correlations: C) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            config,
            transport,
            correlations,
            pools: HashMap::new(),
            streams: HashMap::new(),
            routes: HashMap::new(),
        })
    }

    /// Register a request stream. Returns `false` if the accept id is taken.
    pub fn new_stream(&mut self, init: StreamInit) -> bool {
        if self.streams.contains_key(&init.accept_id) {
            return false;
        }
        self.streams
            .insert(init.accept_id, RequestStream::new(init));
        true
    }

    /// Deliver a signal arriving on accept stream `accept_id`.
    pub fn on_stream(&mut self, accept_id: u64, signal: StreamSignal) {
        let Some(mut stream) = self.streams.remove(&accept_id) else {
            debug!(accept = accept_id, signal = signal.kind(), "signal for unknown stream");
            self.transport.signal_reset(accept_id, signal.trace());
            return;
        };
        self.dispatch_stream(&mut stream, signal);
        self.restore(stream);
    }

    /// Deliver a throttle signal arriving on connect stream `connect_id`.
    pub fn on_throttle(&mut self, connect_id: u64, signal: ThrottleSignal) {
        let Some(route) = self.routes.get(&connect_id).cloned() else {
            debug!(connection = connect_id, "throttle for unknown connection");
            return;
        };
        let Some(throttle) = self
            .pools
            .get(&route)
            .and_then(|pool| pool.connection(connect_id))
            .map(|connection| connection.throttle())
        else {
            return;
        };

        match throttle {
            Throttle::Default => self.on_default_throttle(&route, connect_id, signal),
            Throttle::Request(accept_id) => match self.streams.remove(&accept_id) {
                Some(mut stream) => {
                    self.dispatch_throttle(&mut stream, connect_id, signal);
                    self.restore(stream);
                }
                None => {
                    warn!(
                        connection = connect_id,
                        accept = accept_id,
                        "throttle bound to missing stream, using default"
                    );
                    if let Some(pool) = self.pools.get_mut(&route) {
                        pool.set_default_throttle(connect_id);
                    }
                    self.on_default_throttle(&route, connect_id, signal);
                }
            },
        }
    }

    /// End the lease on `connect_id`, e.g. once its response has completed.
    ///
    /// Releasing a connection that is idle, gone, or still being written by
    /// a request stream does nothing. A non-persistent connection should be
    /// released with `Some(CloseAction::End)` (or `Abort`): its record is
    /// kept until a termination has been sent or the destination resets it.
    pub fn release(&mut self, connect_id: u64, action: Option<CloseAction>) {
        let Some(route) = self.routes.get(&connect_id).cloned() else {
            return;
        };
        let throttle = self
            .pools
            .get(&route)
            .and_then(|pool| pool.connection(connect_id))
            .map(|connection| connection.throttle());
        if let Some(Throttle::Request(accept_id)) = throttle {
            debug!(
                connection = connect_id,
                accept = accept_id,
                "connection still carries a request, release ignored"
            );
            return;
        }
        self.release_on(&route, connect_id, action, 0);
    }

    /// Record the connect-reply stream paired with `connect_id`. A reset of
    /// the connection is propagated to it.
    pub fn set_connection_input(&mut self, connect_id: u64, reply_stream_id: u64) -> bool {
        let Some(route) = self.routes.get(&connect_id) else {
            return false;
        };
        match self
            .pools
            .get_mut(route)
            .and_then(|pool| pool.connection_mut(connect_id))
        {
            Some(connection) => {
                connection.reply_stream = Some(reply_stream_id);
                true
            }
            None => false,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// The registry the response router removes entries from when a
    /// response begins.
    pub fn correlations(&self) -> &C {
        &self.correlations
    }

    pub fn correlations_mut(&mut self) -> &mut C {
        &mut self.correlations
    }

    pub fn pool(&self, route: &Route) -> Option<&ConnectionPool> {
        self.pools.get(route)
    }

    pub fn pools(&self) -> impl Iterator<Item = &ConnectionPool> {
        self.pools.values()
    }

    pub fn stream(&self, accept_id: u64) -> Option<&RequestStream> {
        self.streams.get(&accept_id)
    }

    pub(crate) fn restore(&mut self, stream: RequestStream) {
        if !stream.is_terminal() {
            self.streams.insert(stream.accept_id(), stream);
        }
    }

    pub(crate) fn release_on(
        &mut self,
        route: &Route,
        connect_id: u64,
        action: Option<CloseAction>,
        trace: u64,
    ) {
        let Some(pool) = self.pools.get_mut(route) else {
            return;
        };
        let released = pool.release(
            connect_id,
            action,
            trace,
            &mut self.transport,
            &mut self.correlations,
        );
        if released.closed {
            self.routes.remove(&connect_id);
        }
        if let Some((request, assignment)) = released.next {
            if assignment.opened {
                self.routes.insert(assignment.connection, route.clone());
            }
            self.serve_queued(request, assignment.connection);
        }
    }

    fn on_default_throttle(&mut self, route: &Route, connect_id: u64, signal: ThrottleSignal) {
        let Some(connection) = self
            .pools
            .get_mut(route)
            .and_then(|pool| pool.connection_mut(connect_id))
        else {
            return;
        };

        match signal {
            ThrottleSignal::Window {
                credit, padding, ..
            } => connection.budget.grant(credit, padding),
            ThrottleSignal::Reset { trace } => {
                let reply = connection.reply_stream;
                connection.mark_reset();
                debug!(route = %route, connection = connect_id, "connection reset");
                self.release_on(route, connect_id, None, trace);
                if let Some(reply) = reply {
                    self.transport.signal_reset(reply, trace);
                }
            }
        }
    }
}
