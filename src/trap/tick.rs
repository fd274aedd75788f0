// nt_trapos/src/trap/tick.rs

//! # Tick Clock
//!
//! Coarse monotonic clock advanced by the timer interrupt on the owning hart.
//! Sleepers wait on the clock's own address as their wakeup key.

use crate::trap::infrastructure::di::traits::Scheduler;
use core::sync::atomic::{AtomicU64, Ordering};
use spin::Mutex;

pub struct TickClock {
    ticks: Mutex<u64>,
    /// Copy of the counter for lock-free readers; may lag `ticks`.
    published: AtomicU64,
}

impl TickClock {
    pub const fn new() -> Self {
        Self {
            ticks: Mutex::new(0),
            published: AtomicU64::new(0),
        }
    }

    /// Advances the clock by one and wakes sleepers, as one step under the lock.
    pub fn tick(&self, scheduler: &dyn Scheduler) -> u64 {
        let mut ticks = self.ticks.lock();
        *ticks += 1;
        scheduler.wakeup(self.wait_key());
        self.published.store(*ticks, Ordering::Release);
        *ticks
    }

    /// Current tick count without taking the lock.
    pub fn ticks(&self) -> u64 {
        self.published.load(Ordering::Acquire)
    }

    /// Wakeup key for sleepers waiting on the clock.
    pub fn wait_key(&self) -> usize {
        self as *const Self as usize
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new()
    }
}
