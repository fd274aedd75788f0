// nt_trapos/src/trap/ds/process.rs

//! # Process View
//!
//! The slice of a process record the trap path reads and writes. Creation,
//! scheduling and teardown belong to the process subsystem; the dispatcher
//! only flips `killed`, reads the state and the address-space bound, and
//! hands the page table to the mapper.

use super::memory::PageTableHandle;
use alloc::string::String;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use spin::Mutex;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProcState {
    Unused,
    Embryo,
    Sleeping,
    Runnable,
    Running,
    Zombie,
}

pub struct Process {
    pid: u32,
    name: String,
    /// Address-space size bound in bytes.
    sz: AtomicUsize,
    /// Set by the process itself or by another hart; acted on at the next
    /// user-privilege trap exit.
    killed: AtomicBool,
    state: Mutex<ProcState>,
    page_table: PageTableHandle,
}

impl Process {
    pub fn new(pid: u32, name: impl Into<String>, sz: usize, page_table: PageTableHandle) -> Self {
        Self {
            pid,
            name: name.into(),
            sz: AtomicUsize::new(sz),
            killed: AtomicBool::new(false),
            state: Mutex::new(ProcState::Running),
            page_table,
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> usize {
        self.sz.load(Ordering::Acquire)
    }

    /// Grows or shrinks the bound; only the owning process's own path calls this.
    pub fn set_size(&self, sz: usize) {
        self.sz.store(sz, Ordering::Release);
    }

    pub fn is_killed(&self) -> bool {
        self.killed.load(Ordering::Acquire)
    }

    pub fn kill(&self) {
        self.killed.store(true, Ordering::Release);
    }

    pub fn state(&self) -> ProcState {
        *self.state.lock()
    }

    pub fn set_state(&self, state: ProcState) {
        *self.state.lock() = state;
    }

    pub fn page_table(&self) -> PageTableHandle {
        self.page_table
    }
}

impl core::fmt::Debug for Process {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Process")
            .field("pid", &self.pid)
            .field("name", &self.name)
            .field("sz", &format_args!("{:#x}", self.size()))
            .field("killed", &self.is_killed())
            .field("state", &self.state())
            .finish()
    }
}
