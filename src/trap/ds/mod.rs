// nt_trapos/src/trap/ds/mod.rs

//! # Trap Data Structures Module
//!
//! Defines the core data structures for the trap subsystem: saved contexts,
//! trap causes, gate descriptors, the process view, memory handles and
//! error definitions.

pub mod types;
pub mod context;
pub mod error;
pub mod gate;
pub mod memory;
pub mod process;

// Re-export key types for convenient access by other modules.
pub use self::types::{TrapCause, TrapMode, Interrupt, Exception};

pub use self::context::{TrapContext, PrivilegeLevel};

pub use self::error::{
    codes, SystemError, ErrorCode, ErrorSource, ErrorLevel, MapError,
};

pub use self::gate::{GateDescriptor, GateKind, HandlerKind, DeviceKind};

pub use self::memory::{Frame, PageTableHandle, PteFlags};

pub use self::process::{Process, ProcState};
