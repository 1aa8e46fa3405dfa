use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> u64;
}

/// Strictly increasing numeric ids, safe to share across threads.
#[derive(Debug)]
pub struct MonotonicIds {
    next: AtomicU64,
}

impl MonotonicIds {
    pub fn starting_at(start: u64) -> Self {
        Self { next: AtomicU64::new(start) }
    }

    /// First id is the current epoch time in milliseconds.
    pub fn from_clock() -> Self {
        let millis = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(1);
        Self::starting_at(millis)
    }
}

impl Default for MonotonicIds {
    fn default() -> Self {
        Self::from_clock()
    }
}

impl IdGenerator for MonotonicIds {
    fn next_id(&self) -> u64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}
