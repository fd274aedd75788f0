// nt_trapos/src/trap/api.rs

//! # Public API for the Trap Subsystem
//!
//! Provides a stable interface for the rest of the kernel: bring-up, the
//! interrupt-enable flag, the tick clock, the allocator mode and the fault
//! journal.

use crate::config::AllocatorMode;
use crate::trap::ds::{ErrorCode, GateDescriptor, SystemError, TrapMode};
use crate::trap::infrastructure::di::{self, with_trap_system, TrapDeps};
use alloc::vec::Vec;

/// Errors that can occur when interacting with the Trap API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrapApiError {
    SystemNotInitialized,
    AlreadyInitialized,
}

impl core::fmt::Display for TrapApiError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::SystemNotInitialized => write!(f, "Trap system has not been initialized."),
            Self::AlreadyInitialized => write!(f, "Trap system is already initialized."),
        }
    }
}

/// Builds the vector table and the dispatcher, then loads the trap vector
/// on the boot hart. Call once, after the heap is up and before any
/// interrupt is enabled.
pub fn init(deps: TrapDeps, mode: TrapMode) -> Result<(), TrapApiError> {
    di::initialize_trap_system(deps, mode)
        .map(|_| ())
        .map_err(|_| TrapApiError::AlreadyInitialized)
}

/// Loads the shared vector table on a secondary hart.
pub fn init_hart(mode: TrapMode) -> Result<(), TrapApiError> {
    with_trap_system(|ts| ts.initialize(mode)).ok_or(TrapApiError::SystemNotInitialized)
}

pub fn is_initialized() -> bool {
    di::is_initialized()
}

/// Enables all supervisor-level interrupts.
pub fn enable_interrupts() -> bool {
    with_trap_system(|ts| ts.hardware_controller().enable_interrupts()).unwrap_or(false)
}

/// Disables all supervisor-level interrupts.
pub fn disable_interrupts() -> bool {
    with_trap_system(|ts| ts.hardware_controller().disable_interrupts()).unwrap_or(false)
}

/// Restores global interrupt state.
pub fn restore_interrupts(was_enabled: bool) {
    with_trap_system(|ts| ts.hardware_controller().restore_interrupts(was_enabled));
}

/// Timer ticks since boot; 0 before initialization.
pub fn ticks() -> u64 {
    with_trap_system(|ts| ts.clock().ticks()).unwrap_or(0)
}

/// Wakeup key sleepers use to wait for the next tick.
pub fn ticks_wait_key() -> Result<usize, TrapApiError> {
    with_trap_system(|ts| ts.clock().wait_key()).ok_or(TrapApiError::SystemNotInitialized)
}

pub fn allocator_mode() -> Result<AllocatorMode, TrapApiError> {
    with_trap_system(|ts| ts.allocator_mode()).ok_or(TrapApiError::SystemNotInitialized)
}

/// Switches the page allocator mode for every process. Faults already
/// being resolved finish under the mode they started with.
pub fn set_allocator_mode(mode: AllocatorMode) -> Result<(), TrapApiError> {
    with_trap_system(|ts| ts.config().set_allocator_mode(mode))
        .ok_or(TrapApiError::SystemNotInitialized)
}

/// Journaled trap diagnostics, oldest first.
pub fn recent_faults() -> Vec<SystemError> {
    with_trap_system(|ts| ts.error_manager().recent()).unwrap_or_default()
}

/// The gate installed for `trapno`.
pub fn gate(trapno: usize) -> Option<GateDescriptor> {
    with_trap_system(|ts| ts.vectors().gate(trapno).copied()).flatten()
}

/// Reports a system error to the fault journal.
pub fn report_system_error(error: SystemError) -> Result<(), TrapApiError> {
    with_trap_system(|ts| ts.error_manager().record(error))
        .ok_or(TrapApiError::SystemNotInitialized)
}

/// Creates a `SystemError` stamped with the current tick.
pub fn create_system_error(
    code: ErrorCode,
    message: impl Into<alloc::string::String>,
    address: Option<usize>,
    instruction_pointer: usize,
) -> SystemError {
    SystemError::new(code, message, address, instruction_pointer, ticks())
}
