use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Weak;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tokio::time::Sleep;

use crate::entry::PoolEntry;
use crate::error::PoolError;

pub(crate) type LeaseResult<R, C> = Result<PoolEntry<R, C>, PoolError>;

/// Takes back an entry a lease received but never handed to its caller.
pub(crate) trait Reclaim<R, C>: Send + Sync {
    fn reclaim(&self, entry: PoolEntry<R, C>);
}

/// A pending lease, resolves to a [`PoolEntry`] or a [`PoolError`].
///
/// Dropping the future cancels the request. A connection established on its behalf
/// stays in the pool as an idle entry.
#[must_use = "a lease does nothing unless polled"]
pub struct Lease<R, C> {
    rx: oneshot::Receiver<LeaseResult<R, C>>,
    deadline: Option<Pin<Box<Sleep>>>,
    pool: Weak<dyn Reclaim<R, C>>,
    done: bool,
}

impl<R, C> Lease<R, C> {
    pub(crate) fn new(
        rx: oneshot::Receiver<LeaseResult<R, C>>,
        deadline: Option<Pin<Box<Sleep>>>,
        pool: Weak<dyn Reclaim<R, C>>,
    ) -> Self {
        Self { rx, deadline, pool, done: false }
    }

    /// Gives up waiting, same as dropping the lease.
    pub fn cancel(self) {
        drop(self);
    }
}

impl<R, C> Future for Lease<R, C> {
    type Output = Result<PoolEntry<R, C>, PoolError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        if this.done {
            return Poll::Ready(Err(PoolError::Cancelled));
        }

        if let Poll::Ready(received) = Pin::new(&mut this.rx).poll(cx) {
            this.done = true;
            return Poll::Ready(match received {
                Ok(result) => result,
                // the pool went away without answering
                Err(_) => Err(PoolError::Cancelled),
            });
        }

        if let Some(deadline) = this.deadline.as_mut()
            && deadline.as_mut().poll(cx).is_ready()
        {
            this.done = true;
            this.rx.close();
            // an entry delivered at the last moment still counts
            return Poll::Ready(this.rx.try_recv().unwrap_or(Err(PoolError::LeaseTimeout)));
        }
        Poll::Pending
    }
}

impl<R, C> Drop for Lease<R, C> {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        self.rx.close();
        if let Ok(Ok(entry)) = self.rx.try_recv()
            && let Some(pool) = self.pool.upgrade()
        {
            pool.reclaim(entry);
        }
    }
}

impl<R, C> fmt::Debug for Lease<R, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease").field("done", &self.done).field("deadline", &self.deadline.is_some()).finish()
    }
}
