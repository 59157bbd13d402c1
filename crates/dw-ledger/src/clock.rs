use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Millisecond clock for record `createdAt` values.
///
/// Every value returned by [`now`](Self::now) is strictly greater than any
/// value previously returned or [`observe`](Self::observe)d, even if the wall
/// clock stalls or steps backwards.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last_ms: AtomicU64,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next timestamp: `max(wall_clock, last + 1)`.
    pub fn now(&self) -> u64 {
        let wall = Self::wall_clock_ms();
        let mut last = self.last_ms.load(Ordering::SeqCst);
        loop {
            let next = wall.max(last.saturating_add(1));
            match self
                .last_ms
                .compare_exchange_weak(last, next, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return next,
                Err(current) => last = current,
            }
        }
    }

    /// Advance past a timestamp seen elsewhere, e.g. in imported records.
    pub fn observe(&self, ms: u64) {
        self.last_ms.fetch_max(ms, Ordering::SeqCst);
    }

    /// Most recently issued or observed timestamp.
    pub fn last(&self) -> u64 {
        self.last_ms.load(Ordering::SeqCst)
    }

    fn wall_clock_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}
