use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of pool entry ids.
pub trait IdGenerator: fmt::Debug + Send + Sync + 'static {
    fn next_id(&self) -> u64;
}

/// Sequential ids starting at 1.
#[derive(Debug, Default)]
pub struct AtomicIdGenerator {
    last: AtomicU64,
}

impl IdGenerator for AtomicIdGenerator {
    fn next_id(&self) -> u64 {
        self.last.fetch_add(1, Ordering::Relaxed) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential() {
        let ids = AtomicIdGenerator::default();
        assert_eq!((ids.next_id(), ids.next_id(), ids.next_id()), (1, 2, 3));
    }
}
