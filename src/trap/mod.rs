// nt_trapos/src/trap/mod.rs

//! # Trap Dispatch Subsystem
//!
//! Routes every trap (exception, interrupt or system call) taken by a hart
//! to its handler: system calls to the system-call layer, page faults to the
//! lazy resolver, timer and device interrupts to the tick clock and drivers,
//! and everything else to the kill-or-halt default path.

pub mod ds;
pub mod infrastructure;
pub mod tick;
pub mod vector;
mod api;

// Publicly re-export the entire API module.
pub use self::api::*;

// Re-export key data structures that users of the API might need directly.
pub use self::ds::{
    TrapMode, Interrupt, Exception, TrapCause,            // Core trap types
    TrapContext, PrivilegeLevel,                         // Saved state
    GateDescriptor, GateKind, HandlerKind, DeviceKind,   // Vector table entries
    Process, ProcState, Frame, PageTableHandle, PteFlags, // Collaborator views
    SystemError, ErrorCode, ErrorSource, ErrorLevel, MapError,
};

pub use self::infrastructure::di::traits::{
    DeviceDriver, ErrorManager, FrameAllocator, HardwareController, InterruptController,
    PageMapper, ProcessRegistry, Scheduler, SyscallLayer,
};
pub use self::infrastructure::di::{TrapDeps, TrapSystem};
pub use self::infrastructure::error_manager::HeapErrorManager;
pub use self::infrastructure::fault_resolver::{DeclineReason, FaultOutcome, LazyFaultResolver};
pub use self::tick::TickClock;
pub use self::vector::VectorTable;
