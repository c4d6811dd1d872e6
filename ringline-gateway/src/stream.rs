//! Per-request state machine.
//!
//! A [`RequestStream`] carries one caller request from `Begin` to the point
//! where its last body byte has been written on a pooled connection. Signals
//! are dispatched on `(state, signal)`; anything the current state does not
//! accept resets the caller's stream and leaves it draining.

use std::collections::HashMap;

use bytes::Bytes;
use ringline_h1::{HeaderField, encode_request};
use tracing::{debug, warn};

use crate::connection::{Connection, Throttle};
use crate::correlation::{Correlation, CorrelationRegistry};
use crate::error::Error;
use crate::gateway::Gateway;
use crate::metrics;
use crate::pool::{Acquired, ConnectionPool};
use crate::route::Route;
use crate::signal::{CloseAction, StreamSignal, ThrottleSignal};
use crate::transport::{Transport, service_unavailable};

/// Request stream state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Waiting for `Begin`.
    BeforeBegin,
    /// Headers encoded, waiting for a connection or for window to flush them.
    BeforeHeadersWritten,
    /// Headers written; body data is forwarded as it arrives.
    AfterBeginOrData,
    /// The caller ended or aborted. Terminal.
    AfterEndOrAbort,
    /// The caller was answered or reset. Data is acknowledged and dropped
    /// until the caller ends or aborts.
    AfterReplyOrReset,
}

/// The stream's hold on a pooled connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lease {
    /// No connection, and none requested.
    Unassigned,
    /// Waiting in the pool's queue.
    Queued,
    /// Writing the request on this connect stream.
    Leased(u64),
    /// Request fully written; the connection now waits for its response.
    Detached(u64),
}

/// What the accept side knows about a new request.
#[derive(Debug, Clone)]
pub struct StreamInit {
    pub accept_id: u64,
    /// Reply target for responses synthesized by the gateway.
    pub accept_name: String,
    pub accept_correlation_id: u64,
    pub route: Route,
    pub headers: Vec<HeaderField>,
}

#[derive(Debug)]
pub struct RequestStream {
    accept_id: u64,
    accept_name: String,
    accept_correlation_id: u64,
    route: Route,
    headers: Vec<HeaderField>,
    state: StreamState,
    lease: Lease,
    head: Vec<u8>,
    head_offset: usize,
    /// Credit granted to the caller and not yet used.
    source_budget: i64,
    persistent: bool,
    end_deferred: bool,
    trace: u64,
}

impl RequestStream {
    pub(crate) fn new(init: StreamInit) -> Self {
        Self {
            accept_id: init.accept_id,
            accept_name: init.accept_name,
            accept_correlation_id: init.accept_correlation_id,
            route: init.route,
            headers: init.headers,
            state: StreamState::BeforeBegin,
            lease: Lease::Unassigned,
            head: Vec::new(),
            head_offset: 0,
            source_budget: 0,
            persistent: true,
            end_deferred: false,
            trace: 0,
        }
    }

    pub fn accept_id(&self) -> u64 {
        self.accept_id
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn lease(&self) -> Lease {
        self.lease
    }

    /// Persistence computed from the request head. Meaningful after `Begin`.
    pub fn is_persistent(&self) -> bool {
        self.persistent
    }

    pub fn source_budget(&self) -> i64 {
        self.source_budget
    }

    /// Encoded head bytes not yet written.
    pub fn pending_head(&self) -> usize {
        self.head.len() - self.head_offset
    }

    pub fn is_end_deferred(&self) -> bool {
        self.end_deferred
    }

    pub(crate) fn is_terminal(&self) -> bool {
        self.state == StreamState::AfterEndOrAbort
    }
}

fn leased<'a>(
    pools: &'a mut HashMap<Route, ConnectionPool>,
    route: &Route,
    id: u64,
) -> Result<&'a mut Connection, Error> {
    pools
        .get_mut(route)
        .and_then(|pool| pool.connection_mut(id))
        .ok_or(Error::ConnectionGone(id))
}

/// Window signals carry `i32` credit.
fn clamp_credit(credit: i64) -> i32 {
    credit.clamp(0, i64::from(i32::MAX)) as i32
}

impl<T: Transport, C: CorrelationRegistry> Gateway<T, C> {
    pub(crate) fn dispatch_stream(&mut self, stream: &mut RequestStream, signal: StreamSignal) {
        use StreamState::*;

        let trace = signal.trace();
        let kind = signal.kind();
        let result = match (stream.state, signal) {
            (BeforeBegin, StreamSignal::Begin { trace }) => self.process_begin(stream, trace),
            (BeforeHeadersWritten, StreamSignal::End { .. }) => {
                stream.end_deferred = true;
                Ok(())
            }
            (AfterBeginOrData, StreamSignal::Data {
                trace,
                padding,
                payload,
            }) => self.process_data(stream, trace, padding, &payload),
            (AfterBeginOrData, StreamSignal::End { trace }) => {
                self.process_end(stream, trace);
                Ok(())
            }
            (
                BeforeBegin | BeforeHeadersWritten | AfterBeginOrData,
                StreamSignal::Abort { trace },
            ) => {
                self.process_abort(stream, trace);
                Ok(())
            }
            (AfterReplyOrReset, signal) => {
                self.drain(stream, signal);
                Ok(())
            }
            (state, _) => Err(Error::UnexpectedSignal {
                state,
                signal: kind,
            }),
        };

        if let Err(error) = result {
            self.process_unexpected(stream, trace, error);
        }
    }

    pub(crate) fn dispatch_throttle(
        &mut self,
        stream: &mut RequestStream,
        connection: u64,
        signal: ThrottleSignal,
    ) {
        let trace = match signal {
            ThrottleSignal::Window { trace, .. } | ThrottleSignal::Reset { trace } => trace,
        };
        if let Err(error) = self.on_request_throttle(stream, connection, signal) {
            self.process_unexpected(stream, trace, error);
        }
    }

    /// Hand a connection to a stream that was waiting in the queue.
    pub(crate) fn serve_queued(&mut self, request: u64, connection: u64) {
        let Some(mut stream) = self.streams.remove(&request) else {
            warn!(request, connection, "queued request vanished, returning connection");
            if let Some(route) = self.routes.get(&connection).cloned() {
                self.release_on(&route, connection, None, 0);
            }
            return;
        };
        let trace = stream.trace;
        if let Err(error) = self.grant_lease(&mut stream, connection) {
            self.process_unexpected(&mut stream, trace, error);
        }
        self.restore(stream);
    }

    fn process_begin(&mut self, stream: &mut RequestStream, trace: u64) -> Result<(), Error> {
        metrics::REQUESTS.increment();
        stream.trace = trace;

        let headers = std::mem::take(&mut stream.headers);
        let encoded = encode_request(&headers)?;
        if encoded.bytes.len() > self.config.buffer_slot_capacity {
            return Err(Error::HeadersTooLarge {
                size: encoded.bytes.len(),
                capacity: self.config.buffer_slot_capacity,
            });
        }
        stream.head = encoded.bytes;
        stream.head_offset = 0;
        stream.persistent = encoded.persistent;
        stream.state = StreamState::BeforeHeadersWritten;

        let config = &self.config;
        let pool = self
            .pools
            .entry(stream.route.clone())
            .or_insert_with(|| ConnectionPool::new(stream.route.clone(), config));

        match pool.acquire(stream.accept_id, trace, &mut self.transport) {
            Acquired::Leased(assignment) => {
                if assignment.opened {
                    self.routes.insert(assignment.connection, stream.route.clone());
                }
                self.grant_lease(stream, assignment.connection)?;
            }
            Acquired::Queued => stream.lease = Lease::Queued,
            Acquired::Rejected => {
                metrics::RESPONSES.increment();
                metrics::REQUESTS_REJECTED.increment();
                warn!(
                    route = %stream.route,
                    accept = stream.accept_id,
                    "no connection and queue full, answering 503"
                );
                self.transport.send_response(
                    &stream.accept_name,
                    stream.accept_correlation_id,
                    &service_unavailable(),
                );
                stream.state = StreamState::AfterReplyOrReset;
            }
        }
        Ok(())
    }

    fn grant_lease(&mut self, stream: &mut RequestStream, id: u64) -> Result<(), Error> {
        let connection = leased(&mut self.pools, &stream.route, id)?;
        connection.persistent = stream.persistent;
        connection.throttle = Throttle::Request(stream.accept_id);
        let correlation_id = connection.correlation_id();
        let has_budget = connection.budget.credit() > 0;
        stream.lease = Lease::Leased(id);

        self.correlations.put(
            correlation_id,
            Correlation {
                accept_correlation_id: stream.accept_correlation_id,
                reply_to: stream.accept_name.clone(),
                route: stream.route.clone(),
                connection: id,
            },
        );
        debug!(
            route = %stream.route,
            accept = stream.accept_id,
            connection = id,
            persistent = stream.persistent,
            "connection leased"
        );

        if has_budget {
            self.write_headers(stream, id)?;
        }
        Ok(())
    }

    /// Write as much of the pending head as the connection budget allows.
    fn write_headers(&mut self, stream: &mut RequestStream, id: u64) -> Result<(), Error> {
        let connection = leased(&mut self.pools, &stream.route, id)?;
        let writable = stream.pending_head().min(connection.budget.writable());
        if writable == 0 {
            return Ok(());
        }
        connection.budget.consume(writable)?;
        let padding = connection.budget.padding();
        let connect_id = connection.stream_id();
        let spare = connection.budget.credit() > 0;

        let end = stream.head_offset + writable;
        self.transport
            .write(connect_id, stream.trace, padding, &stream.head[stream.head_offset..end]);
        stream.head_offset = end;

        if stream.pending_head() > 0 {
            return Ok(());
        }
        stream.head = Vec::new();
        stream.head_offset = 0;
        let trace = stream.trace;
        if stream.end_deferred {
            self.process_end(stream, trace);
        } else {
            stream.state = StreamState::AfterBeginOrData;
            if spare {
                self.grant_source_window(stream, id, trace)?;
            }
        }
        Ok(())
    }

    /// Top the caller's credit up to the connection's budget.
    fn grant_source_window(
        &mut self,
        stream: &mut RequestStream,
        id: u64,
        trace: u64,
    ) -> Result<(), Error> {
        let connection = leased(&mut self.pools, &stream.route, id)?;
        let credit = clamp_credit(connection.budget.credit() - stream.source_budget);
        if credit > 0 {
            let padding = connection.budget.padding();
            stream.source_budget += i64::from(credit);
            self.transport
                .grant_window(stream.accept_id, trace, credit, padding);
        }
        Ok(())
    }

    fn process_data(
        &mut self,
        stream: &mut RequestStream,
        trace: u64,
        padding: i32,
        payload: &Bytes,
    ) -> Result<(), Error> {
        let cost = payload.len() as i64 + i64::from(padding);
        if stream.source_budget - cost < 0 {
            return Err(Error::FlowControl);
        }
        stream.source_budget -= cost;

        let Lease::Leased(id) = stream.lease else {
            return Err(Error::NotLeased);
        };
        let connection = leased(&mut self.pools, &stream.route, id)?;
        connection.budget.consume(payload.len())?;
        let padding = connection.budget.padding();
        let connect_id = connection.stream_id();
        self.transport.write(connect_id, trace, padding, payload);
        Ok(())
    }

    /// Detach from the connection; the response is someone else's business.
    fn process_end(&mut self, stream: &mut RequestStream, trace: u64) {
        if let Lease::Leased(id) = stream.lease {
            if let Some(pool) = self.pools.get_mut(&stream.route) {
                pool.set_default_throttle(id);
            }
            stream.lease = Lease::Detached(id);
        }
        stream.state = StreamState::AfterEndOrAbort;
        debug!(accept = stream.accept_id, trace, "request complete");
    }

    fn process_abort(&mut self, stream: &mut RequestStream, trace: u64) {
        self.give_up_lease(stream, trace);
        stream.state = StreamState::AfterEndOrAbort;
        debug!(accept = stream.accept_id, trace, "request aborted");
    }

    fn on_request_throttle(
        &mut self,
        stream: &mut RequestStream,
        id: u64,
        signal: ThrottleSignal,
    ) -> Result<(), Error> {
        match signal {
            ThrottleSignal::Window {
                trace,
                credit,
                padding,
            } => {
                leased(&mut self.pools, &stream.route, id)?
                    .budget
                    .grant(credit, padding);
                match stream.state {
                    StreamState::BeforeHeadersWritten => self.write_headers(stream, id),
                    StreamState::AfterBeginOrData => self.grant_source_window(stream, id, trace),
                    _ => Ok(()),
                }
            }
            ThrottleSignal::Reset { trace } => {
                self.process_reset(stream, id, trace);
                Ok(())
            }
        }
    }

    /// The destination refused the connection mid-request.
    fn process_reset(&mut self, stream: &mut RequestStream, id: u64, trace: u64) {
        if let Ok(connection) = leased(&mut self.pools, &stream.route, id) {
            connection.mark_reset();
        }
        stream.lease = Lease::Unassigned;
        self.release_on(&stream.route, id, None, trace);
        self.transport.signal_reset(stream.accept_id, trace);
        stream.state = StreamState::AfterReplyOrReset;
        debug!(accept = stream.accept_id, connection = id, "connection reset during request");
    }

    fn process_unexpected(&mut self, stream: &mut RequestStream, trace: u64, error: Error) {
        debug!(
            accept = stream.accept_id,
            route = %stream.route,
            state = ?stream.state,
            %error,
            "protocol violation, resetting stream"
        );
        self.transport.signal_reset(stream.accept_id, trace);
        self.give_up_lease(stream, trace);
        stream.state = StreamState::AfterReplyOrReset;
    }

    /// Leave the queue, or abort the connection being written to.
    fn give_up_lease(&mut self, stream: &mut RequestStream, trace: u64) {
        match stream.lease {
            Lease::Queued => {
                if let Some(pool) = self.pools.get_mut(&stream.route) {
                    pool.cancel(stream.accept_id);
                }
            }
            Lease::Leased(id) => {
                if let Ok(connection) = leased(&mut self.pools, &stream.route, id) {
                    connection.persistent = false;
                    let correlation_id = connection.correlation_id();
                    self.correlations.remove(correlation_id);
                }
                self.release_on(&stream.route, id, Some(CloseAction::Abort), trace);
            }
            Lease::Unassigned | Lease::Detached(_) => return,
        }
        stream.lease = Lease::Unassigned;
    }

    fn drain(&mut self, stream: &mut RequestStream, signal: StreamSignal) {
        match signal {
            StreamSignal::Data { trace, payload, .. } => {
                self.transport.grant_window(
                    stream.accept_id,
                    trace,
                    clamp_credit(payload.len() as i64),
                    0,
                );
            }
            StreamSignal::End { .. } | StreamSignal::Abort { .. } => {
                stream.state = StreamState::AfterEndOrAbort;
            }
            StreamSignal::Begin { .. } => {}
        }
    }
}
