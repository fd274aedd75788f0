// nt_trapos/src/trap/ds/types.rs

//! # Trap Type Definitions
//!
//! Defines various enums and structs related to RISC-V trap causes and
//! their translation into kernel vector numbers.

use crate::config::*;
use core::fmt;

/// Defines the mode of the trap vector.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(usize)]
pub enum TrapMode {
    /// All traps are handled by a single entry function (`stvec`).
    Direct = 0,
    /// Different trap types can have different handlers, if the hardware supports it.
    Vectored = 1,
}

/// Supervisor-level interrupts available in S-mode.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(usize)]
pub enum Interrupt {
    SupervisorSoft = 1,
    SupervisorTimer = 5,
    SupervisorExternal = 9,
}

/// Supervisor-level exceptions.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(usize)]
pub enum Exception {
    InstructionMisaligned = 0,
    InstructionFault = 1,
    IllegalInstruction = 2,
    Breakpoint = 3,
    LoadMisaligned = 4,
    LoadFault = 5,
    StoreMisaligned = 6,
    StoreFault = 7,
    UserEnvCall = 8,
    SupervisorEnvCall = 9,
    InstructionPageFault = 12,
    LoadPageFault = 13,
    StorePageFault = 15,
}

/// A wrapper for the `scause` register, providing a safe interface to interpret its value.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct TrapCause {
    bits: usize,
}

const INTERRUPT_BIT: usize = 1 << (usize::BITS - 1);

impl TrapCause {
    /// Creates a `TrapCause` from the raw bits of the `scause` register.
    pub const fn from_bits(bits: usize) -> Self {
        Self { bits }
    }

    /// Builds the `scause` value hardware would report for an exception.
    pub const fn exception(e: Exception) -> Self {
        Self { bits: e as usize }
    }

    /// Builds the `scause` value hardware would report for an interrupt.
    pub const fn interrupt(i: Interrupt) -> Self {
        Self { bits: INTERRUPT_BIT | i as usize }
    }

    /// Returns the raw bits of the `scause` register.
    pub const fn bits(&self) -> usize {
        self.bits
    }

    /// The most significant bit of `scause` is set for interrupts.
    pub const fn is_interrupt(&self) -> bool {
        self.bits & INTERRUPT_BIT != 0
    }

    /// Returns the interrupt or exception code.
    pub const fn code(&self) -> usize {
        self.bits & !INTERRUPT_BIT
    }

    /// True for `ecall` from either privilege level.
    pub const fn is_env_call(&self) -> bool {
        !self.is_interrupt()
            && (self.code() == Exception::UserEnvCall as usize
                || self.code() == Exception::SupervisorEnvCall as usize)
    }

    /// Translates the cause into a vector number.
    ///
    /// External interrupts cannot be resolved from `scause` alone; the
    /// caller supplies the vector obtained from the interrupt controller.
    pub fn to_vector(&self, external: impl FnOnce() -> usize) -> usize {
        if self.is_interrupt() {
            match self.code() {
                1 => T_IRQ0 + IRQ_SPURIOUS,
                5 => T_IRQ0 + IRQ_TIMER,
                9 => external(),
                _ => T_DEFAULT,
            }
        } else {
            match self.code() {
                0 | 4 | 6 => T_ALIGN,
                1 | 5 | 7 => T_GPFLT,
                2 => T_ILLOP,
                3 => T_BRKPT,
                8 | 9 => T_SYSCALL,
                12 | 13 | 15 => T_PGFLT,
                _ => T_DEFAULT,
            }
        }
    }
}

impl fmt::Debug for TrapCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let cause_type = if self.is_interrupt() { "Interrupt" } else { "Exception" };
        write!(
            f,
            "TrapCause::{} (code: {}, raw: {:#x})",
            cause_type,
            self.code(),
            self.bits()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exceptions_map_to_pc_vectors() {
        assert_eq!(TrapCause::exception(Exception::UserEnvCall).to_vector(|| 0), T_SYSCALL);
        assert_eq!(TrapCause::exception(Exception::LoadPageFault).to_vector(|| 0), T_PGFLT);
        assert_eq!(TrapCause::exception(Exception::StorePageFault).to_vector(|| 0), T_PGFLT);
        assert_eq!(TrapCause::exception(Exception::InstructionPageFault).to_vector(|| 0), T_PGFLT);
        assert_eq!(TrapCause::exception(Exception::IllegalInstruction).to_vector(|| 0), T_ILLOP);
        assert_eq!(TrapCause::exception(Exception::StoreFault).to_vector(|| 0), T_GPFLT);
        assert_eq!(TrapCause::from_bits(11).to_vector(|| 0), T_DEFAULT);
    }

    #[test]
    fn interrupts_map_to_irq_vectors() {
        let timer = TrapCause::interrupt(Interrupt::SupervisorTimer);
        assert!(timer.is_interrupt());
        assert_eq!(timer.code(), 5);
        assert_eq!(timer.to_vector(|| 0), T_IRQ0 + IRQ_TIMER);

        let ext = TrapCause::interrupt(Interrupt::SupervisorExternal);
        assert_eq!(ext.to_vector(|| T_IRQ0 + IRQ_COM1), T_IRQ0 + IRQ_COM1);
    }

    #[test]
    fn env_call_detection() {
        assert!(TrapCause::exception(Exception::UserEnvCall).is_env_call());
        assert!(TrapCause::exception(Exception::SupervisorEnvCall).is_env_call());
        assert!(!TrapCause::exception(Exception::Breakpoint).is_env_call());
        // Interrupt code 9 is external, not an ecall.
        assert!(!TrapCause::interrupt(Interrupt::SupervisorExternal).is_env_call());
    }
}
