use std::sync::atomic::{AtomicU64, Ordering};

use crate::clock::Clock;

/// Allocates strictly increasing job ids, seeded from the clock so ids from
/// a restarted master sort after the previous process's.
#[derive(Debug)]
pub struct JobIdGenerator {
    next_id: AtomicU64,
}

impl JobIdGenerator {
    pub fn new(clock: &dyn Clock) -> Self {
        Self {
            next_id: AtomicU64::new(clock.now_ms()),
        }
    }

    pub fn next(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}
