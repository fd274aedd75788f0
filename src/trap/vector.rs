// nt_trapos/src/trap/vector.rs

//! # Vector Table
//!
//! Maps every vector number to a gate descriptor. RISC-V has a single trap
//! entry, so the table is consulted in software by the dispatcher; it is
//! built once at boot and never modified afterwards.

use crate::config::*;
use crate::trap::ds::{DeviceKind, GateDescriptor, GateKind, HandlerKind, PrivilegeLevel};

pub struct VectorTable {
    entries: [GateDescriptor; NVECTORS],
}

impl VectorTable {
    /// Builds the table: every slot is a kernel-only interrupt gate pointing
    /// at `entry`, then the system call slot is opened to user privilege as
    /// a trap gate.
    pub fn new(entry: usize) -> Self {
        let mut entries = [GateDescriptor::kernel(HandlerKind::Exception, entry); NVECTORS];
        for (vector, slot) in entries.iter_mut().enumerate() {
            slot.kind = Self::classify(vector);
        }

        entries[T_SYSCALL] = GateDescriptor {
            kind: HandlerKind::SystemCall,
            gate: GateKind::Trap,
            entry,
            dpl: PrivilegeLevel::User,
        };

        Self { entries }
    }

    fn classify(vector: usize) -> HandlerKind {
        match vector {
            T_PGFLT => HandlerKind::PageFault,
            v if v == T_IRQ0 + IRQ_TIMER => HandlerKind::Timer,
            v if v == T_IRQ0 + IRQ_IDE => HandlerKind::Device(DeviceKind::Disk),
            v if v == T_IRQ0 + IRQ_IDE + 1 => HandlerKind::SecondaryDisk,
            v if v == T_IRQ0 + IRQ_KBD => HandlerKind::Device(DeviceKind::Keyboard),
            v if v == T_IRQ0 + IRQ_COM1 => HandlerKind::Device(DeviceKind::Serial),
            v if v == T_IRQ0 + IRQ_LEGACY_SPURIOUS || v == T_IRQ0 + IRQ_SPURIOUS => {
                HandlerKind::Spurious
            }
            _ => HandlerKind::Exception,
        }
    }

    /// Gate for `vector`, or `None` for numbers outside the table.
    pub fn gate(&self, vector: usize) -> Option<&GateDescriptor> {
        self.entries.get(vector)
    }

    /// Handler class for `vector`; out-of-range numbers take the default path.
    pub fn kind(&self, vector: usize) -> HandlerKind {
        self.gate(vector).map_or(HandlerKind::Exception, |g| g.kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &GateDescriptor)> {
        self.entries.iter().enumerate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STUB: usize = 0x8020_0000;

    #[test]
    fn only_syscall_reachable_from_user() {
        let table = VectorTable::new(STUB);
        let user_gates: alloc::vec::Vec<usize> = table
            .iter()
            .filter(|(_, g)| g.permits(PrivilegeLevel::User))
            .map(|(v, _)| v)
            .collect();
        assert_eq!(user_gates, [T_SYSCALL]);
    }

    #[test]
    fn syscall_is_a_trap_gate_and_the_rest_mask_interrupts() {
        let table = VectorTable::new(STUB);
        for (vector, gate) in table.iter() {
            assert_eq!(gate.entry, STUB);
            if vector == T_SYSCALL {
                assert_eq!(gate.gate, GateKind::Trap);
                assert_eq!(gate.kind, HandlerKind::SystemCall);
            } else {
                assert_eq!(gate.gate, GateKind::Interrupt);
                assert_eq!(gate.dpl, PrivilegeLevel::Kernel);
            }
        }
    }

    #[test]
    fn device_and_fault_classes() {
        let table = VectorTable::new(STUB);
        assert_eq!(table.kind(T_PGFLT), HandlerKind::PageFault);
        assert_eq!(table.kind(T_IRQ0 + IRQ_TIMER), HandlerKind::Timer);
        assert_eq!(table.kind(T_IRQ0 + IRQ_IDE), HandlerKind::Device(DeviceKind::Disk));
        assert_eq!(table.kind(T_IRQ0 + IRQ_IDE + 1), HandlerKind::SecondaryDisk);
        assert_eq!(table.kind(T_IRQ0 + IRQ_KBD), HandlerKind::Device(DeviceKind::Keyboard));
        assert_eq!(table.kind(T_IRQ0 + IRQ_COM1), HandlerKind::Device(DeviceKind::Serial));
        assert_eq!(table.kind(T_IRQ0 + IRQ_LEGACY_SPURIOUS), HandlerKind::Spurious);
        assert_eq!(table.kind(T_IRQ0 + IRQ_SPURIOUS), HandlerKind::Spurious);
        assert_eq!(table.kind(T_GPFLT), HandlerKind::Exception);
        assert_eq!(table.kind(T_DEFAULT), HandlerKind::Exception);
        assert!(table.gate(T_DEFAULT).is_none());
    }
}
