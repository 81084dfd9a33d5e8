use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::entry::{PoolConnection, PoolEntry};

/// Entries of one route. Idle entries are kept most recently used first.
pub(crate) struct RoutePool<R, C> {
    pub(crate) leased: usize,
    pub(crate) pending: usize,
    available: VecDeque<PoolEntry<R, C>>,
}

impl<R, C: PoolConnection> RoutePool<R, C> {
    pub(crate) fn new() -> Self {
        Self { leased: 0, pending: 0, available: VecDeque::new() }
    }

    pub(crate) fn available(&self) -> usize {
        self.available.len()
    }

    /// Everything counted against the route maximum.
    pub(crate) fn allocated(&self) -> usize {
        self.leased + self.pending + self.available.len()
    }

    pub(crate) fn is_unused(&self) -> bool {
        self.allocated() == 0
    }

    /// Takes the most recently used idle entry that is usable for `state`.
    ///
    /// Entries carrying `state` are preferred, entries without state are the fall back.
    /// Candidates failing validation are closed and dropped, the returned count tells
    /// how many.
    pub(crate) fn take_free(
        &mut self,
        state: Option<&str>,
        validate_after: Option<Duration>,
        now: Instant,
    ) -> (Option<PoolEntry<R, C>>, usize) {
        let mut discarded = 0;
        loop {
            let index = state
                .and_then(|state| self.available.iter().position(|entry| entry.matches(Some(state))))
                .or_else(|| self.available.iter().position(|entry| entry.matches(None)));
            let Some(mut entry) = index.and_then(|index| self.available.remove(index)) else {
                return (None, discarded);
            };

            if is_valid(&entry, validate_after, now) {
                return (Some(entry), discarded);
            }
            debug!(id = entry.id(), "discarding stale or expired entry");
            entry.close();
            discarded += 1;
        }
    }

    pub(crate) fn put(&mut self, entry: PoolEntry<R, C>) {
        self.available.push_front(entry);
    }

    /// Removes the least recently used idle entry.
    pub(crate) fn take_last_used(&mut self) -> Option<PoolEntry<R, C>> {
        self.available.pop_back()
    }

    pub(crate) fn last_used(&self) -> Option<Instant> {
        self.available.back().map(PoolEntry::updated)
    }

    /// Closes and drops every idle entry matching `predicate`, returns how many.
    pub(crate) fn close_where<P>(&mut self, mut predicate: P) -> usize
    where
        P: FnMut(&PoolEntry<R, C>) -> bool,
    {
        let before = self.available.len();
        self.available.retain_mut(|entry| {
            if predicate(entry) {
                entry.close();
                false
            } else {
                true
            }
        });
        before - self.available.len()
    }
}

fn is_valid<R, C: PoolConnection>(entry: &PoolEntry<R, C>, validate_after: Option<Duration>, now: Instant) -> bool {
    if entry.is_closed() || entry.is_expired(now) {
        return false;
    }
    match validate_after {
        Some(inactivity) if now.saturating_duration_since(entry.updated()) >= inactivity => {
            !entry.connection().is_stale()
        }
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::tests::FakeConnection;

    fn entry(id: u64, state: Option<&str>) -> PoolEntry<&'static str, FakeConnection> {
        let mut entry = PoolEntry::new(id, "route", FakeConnection::default(), None);
        entry.set_state(state.map(str::to_string));
        entry
    }

    #[test]
    fn prefers_matching_state_then_stateless() {
        let mut pool = RoutePool::new();
        pool.put(entry(1, None));
        pool.put(entry(2, Some("alice")));
        pool.put(entry(3, Some("bob")));

        let now = Instant::now();
        assert_eq!(pool.take_free(Some("alice"), None, now).0.map(|e| e.id()), Some(2));
        assert_eq!(pool.take_free(Some("carol"), None, now).0.map(|e| e.id()), Some(1));
        assert!(pool.take_free(None, None, now).0.is_none());
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn closed_entries_are_discarded() {
        let mut pool = RoutePool::new();
        let mut closed = entry(1, None);
        closed.close();
        pool.put(closed);
        pool.put(entry(2, None));
        pool.put(entry(3, None));

        // most recently used first
        let (found, discarded) = pool.take_free(None, None, Instant::now());
        assert_eq!(found.map(|e| e.id()), Some(3));
        assert_eq!(discarded, 0);

        assert_eq!(pool.take_last_used().map(|e| e.id()), Some(1));
        assert_eq!(pool.allocated(), 1);
    }

    #[test]
    fn stale_check_only_after_inactivity() {
        let mut pool = RoutePool::new();
        let mut stale = entry(1, None);
        stale.connection_mut().stale = true;
        pool.put(stale);

        let now = Instant::now();
        let (found, _) = pool.take_free(None, Some(Duration::from_secs(60)), now);
        let found = found.unwrap();
        pool.put(found);

        let (found, discarded) = pool.take_free(None, Some(Duration::ZERO), now);
        assert!(found.is_none());
        assert_eq!(discarded, 1);
        assert!(pool.is_unused());
    }
}
