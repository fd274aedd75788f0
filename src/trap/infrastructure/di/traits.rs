// nt_trapos/src/trap/infrastructure/di/traits.rs

//! # Dependency Injection Traits
//!
//! Interfaces for everything the trap dispatcher talks to but does not own:
//! the frame allocator, the mapping installer, the scheduler, the process
//! registry, device drivers, the system-call layer, the interrupt controller
//! and the hart's trap hardware. Each is injected into the `TrapSystem`, so
//! the dispatcher can be exercised against substitutes.

use crate::trap::ds::{
    self, Frame, MapError, PageTableHandle, PteFlags, Process, SystemError, TrapContext,
};
use alloc::sync::Arc;
use alloc::vec::Vec;

/// Physical frame allocator.
///
/// # Safety
/// Every frame returned by `allocate_frame` must satisfy the contract of
/// `Frame::from_kernel_addr` until it is passed back to `free_frame` or
/// installed into a page table.
pub unsafe trait FrameAllocator: Send + Sync {
    fn allocate_frame(&self) -> Option<Frame>;
    fn free_frame(&self, frame: Frame);
}

/// Installs virtual-to-physical mappings into a page table.
pub trait PageMapper: Send + Sync {
    /// Maps the page at `va` to `frame` with `flags`. On success the page
    /// table owns the frame.
    fn map(
        &self,
        page_table: PageTableHandle,
        va: usize,
        frame: &Frame,
        flags: PteFlags,
    ) -> Result<(), MapError>;
}

/// The two scheduler actions the dispatcher may trigger, plus wakeups.
pub trait Scheduler: Send + Sync {
    /// Gives up the hart; returns when `proc` is scheduled again.
    fn yield_now(&self, cpu: usize, proc: &Process);
    /// Tears down `proc`. In a running kernel this never returns to the
    /// trap path; the dispatcher returns immediately after calling it.
    fn exit(&self, cpu: usize, proc: &Process);
    /// Wakes every sleeper waiting on `key`.
    fn wakeup(&self, key: usize);
}

/// Current-hart and current-process lookup.
pub trait ProcessRegistry: Send + Sync {
    fn current_cpu(&self) -> usize;
    fn current_process(&self) -> Option<Arc<Process>>;
}

/// An external driver's interrupt entry point.
pub trait DeviceDriver: Send + Sync {
    fn handle_interrupt(&self);
}

/// The system-call layer. It reads arguments from `tf` and writes the
/// return value back into it; it may mark `proc` killed.
pub trait SyscallLayer: Send + Sync {
    fn dispatch(&self, proc: &Process, tf: &mut TrapContext);
}

/// Interrupt acknowledgement.
pub trait InterruptController: Send + Sync {
    /// Signals end-of-interrupt for `vector` on `cpu`.
    fn end_of_interrupt(&self, cpu: usize, vector: usize);
}

/// Interface for the Error Manager.
///
/// Keeps the journal of trap diagnostics and the kernel panic flag.
pub trait ErrorManager: Send + Sync {
    /// Records a diagnostic. Fatal records also enter panic mode.
    fn record(&self, error: SystemError);

    /// Diagnostics from oldest to newest.
    fn recent(&self) -> Vec<SystemError>;

    /// Checks if the system is currently in a panic state.
    fn is_panic_mode(&self) -> bool;

    /// Enters panic mode.
    fn enter_panic_mode(&self);
}

/// Interface for Hardware Control.
///
/// Provides an abstraction for basic hardware-level trap control operations.
pub trait HardwareController: Send + Sync {
    /// Points the hart's trap vector at the kernel entry stub.
    fn init_trap_vector(&self, mode: ds::TrapMode);

    /// Address of the entry stub recorded in every gate.
    fn trap_entry(&self) -> usize;

    /// Enables all supervisor-level interrupts.
    /// Returns `true` if interrupts were previously enabled.
    fn enable_interrupts(&self) -> bool;

    /// Disables all supervisor-level interrupts.
    /// Returns `true` if interrupts were previously enabled.
    fn disable_interrupts(&self) -> bool;

    /// Restores interrupts to a previous state.
    fn restore_interrupts(&self, was_enabled: bool);
}
