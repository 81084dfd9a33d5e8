use std::fmt;

/// Snapshot of the pool, or of a single route.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Entries handed out and not released yet.
    pub leased: usize,
    /// Connections being established.
    pub pending: usize,
    /// Idle entries.
    pub available: usize,
    pub max: usize,
}

impl fmt::Display for PoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[leased: {}; pending: {}; available: {}; max: {}]",
            self.leased, self.pending, self.available, self.max
        )
    }
}
