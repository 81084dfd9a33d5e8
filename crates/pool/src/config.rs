use std::time::Duration;

pub const DEFAULT_MAX_TOTAL: usize = 20;
pub const DEFAULT_MAX_PER_ROUTE: usize = 2;

/// Pool limits and entry life cycle settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    max_total: usize,
    default_max_per_route: usize,
    connect_timeout: Option<Duration>,
    validate_after_inactivity: Option<Duration>,
    time_to_live: Option<Duration>,
}

impl PoolConfig {
    pub fn new() -> Self {
        Self {
            max_total: DEFAULT_MAX_TOTAL,
            default_max_per_route: DEFAULT_MAX_PER_ROUTE,
            connect_timeout: None,
            validate_after_inactivity: None,
            time_to_live: None,
        }
    }

    pub fn with_max_total(mut self, max_total: usize) -> Self {
        self.max_total = max_total;
        self
    }

    pub fn with_default_max_per_route(mut self, max: usize) -> Self {
        self.default_max_per_route = max;
        self
    }

    /// Bounds how long establishing a new connection may take, unbounded when `None`.
    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Idle entries unused for longer than this are checked for staleness before
    /// they are handed out. `None` checks only whether the connection is still open.
    pub fn with_validate_after_inactivity(mut self, inactivity: Option<Duration>) -> Self {
        self.validate_after_inactivity = inactivity;
        self
    }

    /// Maximum lifetime of a pooled connection, counted from its creation.
    pub fn with_time_to_live(mut self, ttl: Option<Duration>) -> Self {
        self.time_to_live = ttl;
        self
    }

    pub fn max_total(&self) -> usize {
        self.max_total
    }

    pub fn default_max_per_route(&self) -> usize {
        self.default_max_per_route
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout
    }

    pub fn validate_after_inactivity(&self) -> Option<Duration> {
        self.validate_after_inactivity
    }

    pub fn time_to_live(&self) -> Option<Duration> {
        self.time_to_live
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new()
    }
}
