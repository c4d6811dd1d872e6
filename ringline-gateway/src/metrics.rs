//! Gateway counters.
//!
//! Process-wide, exposed through metriken. They have no effect on behavior.

use metriken::{Counter, Gauge, metric};

// ── Requests ─────────────────────────────────────────────────────

#[metric(name = "gateway/requests", description = "Requests begun by callers")]
pub static REQUESTS: Counter = Counter::new();

#[metric(
    name = "gateway/responses",
    description = "Responses synthesized by the gateway"
)]
pub static RESPONSES: Counter = Counter::new();

#[metric(
    name = "gateway/requests/rejected",
    description = "Requests refused because the pool and its queue were full"
)]
pub static REQUESTS_REJECTED: Counter = Counter::new();

#[metric(
    name = "gateway/requests/abandoned",
    description = "Requests whose connection was released before a response began"
)]
pub static REQUESTS_ABANDONED: Counter = Counter::new();

// ── Queue ────────────────────────────────────────────────────────

#[metric(name = "gateway/queue/enqueues", description = "Requests queued")]
pub static ENQUEUES: Counter = Counter::new();

#[metric(name = "gateway/queue/dequeues", description = "Requests leaving the queue")]
pub static DEQUEUES: Counter = Counter::new();

// ── Connections ──────────────────────────────────────────────────

#[metric(
    name = "gateway/connections/in_use",
    description = "Connections counted against route limits"
)]
pub static CONNECTIONS_IN_USE: Gauge = Gauge::new();
