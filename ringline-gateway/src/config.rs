use crate::error::Error;

const ENV_MAX_CONNECTIONS: &str = "RINGLINE_GATEWAY_MAX_CONNECTIONS_PER_ROUTE";
const ENV_MAX_QUEUED: &str = "RINGLINE_GATEWAY_MAX_QUEUED_REQUESTS_PER_ROUTE";
const ENV_SLOT_CAPACITY: &str = "RINGLINE_GATEWAY_BUFFER_SLOT_CAPACITY";

/// Configuration for a [`Gateway`](crate::Gateway). Read-only after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Upper bound on connections per route, idle ones included.
    pub max_connections_per_route: usize,
    /// Requests that may wait for a connection per route. 0 disables queueing.
    pub max_queued_requests_per_route: usize,
    /// Largest encoded request head accepted, in bytes.
    pub buffer_slot_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_connections_per_route: 10,
            max_queued_requests_per_route: 10_000,
            buffer_slot_capacity: 65536,
        }
    }
}

impl Config {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_connections_per_route == 0 {
            return Err(Error::Config(
                "max_connections_per_route must be at least 1".into(),
            ));
        }
        if self.buffer_slot_capacity == 0 {
            return Err(Error::Config(
                "buffer_slot_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Defaults overridden by `RINGLINE_GATEWAY_*` environment variables.
    pub fn from_env() -> Result<Self, Error> {
        let mut config = Self::default();
        if let Some(v) = env_usize(ENV_MAX_CONNECTIONS)? {
            config.max_connections_per_route = v;
        }
        if let Some(v) = env_usize(ENV_MAX_QUEUED)? {
            config.max_queued_requests_per_route = v;
        }
        if let Some(v) = env_usize(ENV_SLOT_CAPACITY)? {
            config.buffer_slot_capacity = v;
        }
        config.validate()?;
        Ok(config)
    }
}

fn env_usize(name: &str) -> Result<Option<usize>, Error> {
    match std::env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| {
                Error::Config(format!("{name} must be an unsigned integer, got {value:?}"))
            }),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(Error::Config(format!("{name}: {e}"))),
    }
}
