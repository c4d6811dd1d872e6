//! In-memory transport that records every effect the gateway emits.

#![allow(dead_code)]

use std::collections::HashMap;

use ringline_gateway::{
    Config, Correlation, Gateway, HeaderField, OpenedConnection, Route, StreamInit, Transport,
};

pub const FIRST_CONNECTION: u64 = 1001;
pub const FIRST_CORRELATION: u64 = 5001;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Open {
        route: Route,
        stream_id: u64,
    },
    Write {
        stream_id: u64,
        padding: i32,
        payload: Vec<u8>,
    },
    End(u64),
    Abort(u64),
    Window {
        stream_id: u64,
        credit: i32,
        padding: i32,
    },
    Reset(u64),
    Response {
        reply_to: String,
        correlation_id: u64,
        headers: Vec<HeaderField>,
    },
}

#[derive(Debug, Default)]
pub struct Recorder {
    opened: u64,
    pub events: Vec<Event>,
}

impl Recorder {
    pub fn take(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    /// Bytes written on `stream_id`, concatenated.
    pub fn written(&self, stream_id: u64) -> Vec<u8> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Write {
                    stream_id: id,
                    payload,
                    ..
                } if *id == stream_id => Some(payload.as_slice()),
                _ => None,
            })
            .flatten()
            .copied()
            .collect()
    }

    pub fn opens(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, Event::Open { .. }))
            .count()
    }

    pub fn responses(&self) -> Vec<(String, u64, Vec<HeaderField>)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Response {
                    reply_to,
                    correlation_id,
                    headers,
                } => Some((reply_to.clone(), *correlation_id, headers.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn resets(&self) -> Vec<u64> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Reset(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn windows(&self, stream_id: u64) -> Vec<i32> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Window {
                    stream_id: id,
                    credit,
                    ..
                } if *id == stream_id => Some(*credit),
                _ => None,
            })
            .collect()
    }
}

impl Transport for Recorder {
    fn open_connection(&mut self, route: &Route, _trace: u64) -> OpenedConnection {
        let n = self.opened;
        self.opened += 1;
        self.events.push(Event::Open {
            route: route.clone(),
            stream_id: FIRST_CONNECTION + n,
        });
        OpenedConnection {
            stream_id: FIRST_CONNECTION + n,
            correlation_id: FIRST_CORRELATION + n,
        }
    }

    fn write(&mut self, stream_id: u64, _trace: u64, padding: i32, payload: &[u8]) {
        self.events.push(Event::Write {
            stream_id,
            padding,
            payload: payload.to_vec(),
        });
    }

    fn signal_end(&mut self, stream_id: u64, _trace: u64) {
        self.events.push(Event::End(stream_id));
    }

    fn signal_abort(&mut self, stream_id: u64, _trace: u64) {
        self.events.push(Event::Abort(stream_id));
    }

    fn grant_window(&mut self, stream_id: u64, _trace: u64, credit: i32, padding: i32) {
        self.events.push(Event::Window {
            stream_id,
            credit,
            padding,
        });
    }

    fn signal_reset(&mut self, stream_id: u64, _trace: u64) {
        self.events.push(Event::Reset(stream_id));
    }

    fn send_response(&mut self, reply_to: &str, correlation_id: u64, headers: &[HeaderField]) {
        self.events.push(Event::Response {
            reply_to: reply_to.to_string(),
            correlation_id,
            headers: headers.to_vec(),
        });
    }
}

pub type TestGateway = Gateway<Recorder, HashMap<u64, Correlation>>;

pub fn route() -> Route {
    Route::new("target", 7)
}

pub fn gateway(max_connections: usize, max_queued: usize) -> TestGateway {
    let config = Config {
        max_connections_per_route: max_connections,
        max_queued_requests_per_route: max_queued,
        ..Default::default()
    };
    Gateway::new(config, Recorder::default(), HashMap::new()).unwrap()
}

pub fn request(accept_id: u64, method: &str, path: &str) -> StreamInit {
    StreamInit {
        accept_id,
        accept_name: format!("source-{accept_id}"),
        accept_correlation_id: accept_id + 100,
        route: route(),
        headers: vec![
            HeaderField::new(":method", method),
            HeaderField::new(":scheme", "http"),
            HeaderField::new(":path", path),
            HeaderField::new(":authority", "target.local"),
        ],
    }
}

pub fn get(accept_id: u64) -> StreamInit {
    request(accept_id, "GET", "/")
}

/// The head `get(_)` encodes to.
pub const GET_HEAD: &[u8] = b"GET / HTTP/1.1\r\nHost: target.local\r\n\r\n";
