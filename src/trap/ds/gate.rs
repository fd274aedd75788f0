// nt_trapos/src/trap/ds/gate.rs

//! # Gate Descriptors
//!
//! A gate describes what the kernel does with one vector number: which
//! handler class services it, whether interrupts stay masked while it runs,
//! and the least privileged code allowed to raise it directly.

use super::context::PrivilegeLevel;

/// Whether further interrupts stay masked while the handler runs.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum GateKind {
    /// Interrupts remain disabled for the whole trap.
    Interrupt,
    /// Interrupts are re-enabled before the handler body runs.
    Trap,
}

/// Device classes serviced by an external driver.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DeviceKind {
    Disk,
    Keyboard,
    Serial,
}

/// Handler class a vector is routed to.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum HandlerKind {
    SystemCall,
    PageFault,
    Timer,
    Device(DeviceKind),
    /// Companion interrupt of the secondary disk channel; acknowledged only.
    SecondaryDisk,
    Spurious,
    /// Processor exception or unassigned vector; handled by the default path.
    Exception,
}

/// One slot of the vector table.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct GateDescriptor {
    pub kind: HandlerKind,
    pub gate: GateKind,
    /// Address of the low-level entry stub.
    pub entry: usize,
    /// Least privileged level allowed to raise this vector by instruction.
    pub dpl: PrivilegeLevel,
}

impl GateDescriptor {
    pub const fn kernel(kind: HandlerKind, entry: usize) -> Self {
        Self {
            kind,
            gate: GateKind::Interrupt,
            entry,
            dpl: PrivilegeLevel::Kernel,
        }
    }

    /// Whether code running at `privilege` may raise this vector directly.
    pub fn permits(&self, privilege: PrivilegeLevel) -> bool {
        privilege <= self.dpl
    }
}
