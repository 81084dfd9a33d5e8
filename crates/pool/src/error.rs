use std::io;
use std::time::Duration;

use thiserror::Error;

/// Failure of a lease, delivered through the [`Lease`](crate::Lease) future.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("connection pool is shut down")]
    Shutdown,

    #[error("timeout waiting for a connection from the pool")]
    LeaseTimeout,

    #[error("connect timed out after {timeout:?}")]
    ConnectTimeout { timeout: Duration },

    #[error("connect failed: {source}")]
    Connect {
        #[from]
        source: io::Error,
    },

    #[error("lease request cancelled")]
    Cancelled,

    #[error("unsupported scheme: {scheme}")]
    UnsupportedScheme { scheme: String },
}

impl PoolError {
    pub fn unsupported_scheme<S: ToString>(scheme: S) -> Self {
        Self::UnsupportedScheme { scheme: scheme.to_string() }
    }

    /// Either the lease or the connect attempt ran out of time.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::LeaseTimeout | Self::ConnectTimeout { .. })
    }
}
