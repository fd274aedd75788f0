// nt_trapos/src/trap/infrastructure/error_manager.rs

//! # Heap-based Error Manager Implementation
//!
//! Keeps a bounded journal of trap diagnostics on the heap. When the journal
//! is full the oldest entry is dropped.

use crate::trap::ds::SystemError;
use crate::trap::infrastructure::di::traits::ErrorManager;
use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};
use spin::Mutex;

pub const ERROR_LOG_CAPACITY: usize = 256;

pub struct HeapErrorManager {
    log: Mutex<VecDeque<SystemError>>,
    capacity: usize,
    panic_mode: AtomicBool,
}

impl HeapErrorManager {
    pub fn new() -> Self {
        Self::with_capacity(ERROR_LOG_CAPACITY)
    }

    /// # Panics
    /// Panics if the capacity is 0.
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "error log capacity cannot be zero");
        Self {
            log: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            panic_mode: AtomicBool::new(false),
        }
    }
}

impl Default for HeapErrorManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ErrorManager for HeapErrorManager {
    fn record(&self, error: SystemError) {
        if error.code.is_fatal() {
            self.enter_panic_mode();
        }
        let mut log = self.log.lock();
        if log.len() == self.capacity {
            log.pop_front();
        }
        log.push_back(error);
    }

    fn recent(&self) -> Vec<SystemError> {
        self.log.lock().iter().cloned().collect()
    }

    fn is_panic_mode(&self) -> bool {
        self.panic_mode.load(Ordering::Relaxed)
    }

    fn enter_panic_mode(&self) {
        self.panic_mode.store(true, Ordering::SeqCst);
    }
}
