// nt_trapos/src/trap/ds/context.rs

//! # Trap Context
//!
//! The saved machine state of a hart at the moment a trap occurs. The entry
//! stub in `low_level` builds it on the kernel stack, the dispatcher borrows
//! it mutably for the duration of one trap, and the stub restores from it on
//! the way out.

use super::types::TrapCause;
use core::fmt;

/// `sstatus.SPP`: privilege the hart was running at before the trap.
const SSTATUS_SPP: usize = 1 << 8;

/// Privilege level, either of the interrupted context or required by a gate.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum PrivilegeLevel {
    Kernel = 0,
    User = 3,
}

/// # Trap Context
///
/// This struct precisely matches the register layout saved by the entry stub.
/// The order and size of fields are critical and must not be altered without
/// updating the offsets in `low_level`.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct TrapContext {
    /// General-purpose registers x0-x31.
    pub x: [usize; 32],
    /// Supervisor Status Register (`sstatus`).
    pub sstatus: usize,
    /// Supervisor Exception Program Counter (`sepc`).
    pub sepc: usize,
    /// Supervisor Cause Register (`scause`).
    pub scause: usize,
    /// Supervisor Trap Value Register (`stval`).
    pub stval: usize,
    /// Vector number assigned by the entry bridge.
    pub trapno: usize,
    /// Id of the hart that owns the kernel stack holding this frame.
    /// The exit stub stores it here before returning to user mode and the
    /// entry stub reloads `tp` from it, since user code owns `tp`.
    pub kernel_hartid: usize,
}

impl TrapContext {
    /// Creates a new, zero-initialized `TrapContext`.
    pub const fn new() -> Self {
        Self {
            x: [0; 32],
            sstatus: 0,
            sepc: 0,
            scause: 0,
            stval: 0,
            trapno: 0,
            kernel_hartid: 0,
        }
    }

    /// Builds a context as the entry stub would for a trap taken at
    /// `privilege` with the given cause and vector.
    pub fn with_trap(trapno: usize, cause: TrapCause, privilege: PrivilegeLevel) -> Self {
        let mut ctx = Self::new();
        ctx.trapno = trapno;
        ctx.scause = cause.bits();
        if privilege == PrivilegeLevel::Kernel {
            ctx.sstatus |= SSTATUS_SPP;
        }
        ctx
    }

    /// Interprets the `scause` register to get the high-level trap cause.
    pub fn cause(&self) -> TrapCause {
        TrapCause::from_bits(self.scause)
    }

    /// Privilege of the interrupted context.
    pub fn privilege(&self) -> PrivilegeLevel {
        if self.sstatus & SSTATUS_SPP == 0 {
            PrivilegeLevel::User
        } else {
            PrivilegeLevel::Kernel
        }
    }

    pub fn from_user(&self) -> bool {
        self.privilege() == PrivilegeLevel::User
    }

    /// Whether the trap was raised by an instruction (`ecall`) rather than
    /// by hardware on the program's behalf.
    pub fn is_software_raised(&self) -> bool {
        self.cause().is_env_call()
    }

    /// Raw cause code, reported as the error code in diagnostics.
    pub fn error_code(&self) -> usize {
        self.cause().code()
    }

    /// Faulting data address for memory traps.
    pub fn fault_addr(&self) -> usize {
        self.stval
    }

    /// Steps `sepc` past the trapping instruction.
    /// `ecall` is never compressed, so the step is always 4 bytes.
    pub fn advance_sepc(&mut self) {
        self.sepc += 4;
    }

    /// Argument register `a0`..`a5` for system calls.
    pub fn arg(&self, n: usize) -> usize {
        debug_assert!(n < 6);
        self.x[10 + n]
    }

    /// System call number, passed in `a7`.
    pub fn syscall_number(&self) -> usize {
        self.x[17]
    }

    /// Sets the return value of a function call (e.g., for syscalls).
    /// The `a0` register (x[10]) is conventionally used for return values.
    pub fn set_return_value(&mut self, value: usize) {
        self.x[10] = value;
    }
}

impl Default for TrapContext {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TrapContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrapContext")
            .field("trapno", &self.trapno)
            .field("cause", &self.cause())
            .field("privilege", &self.privilege())
            .field("sepc", &format_args!("{:#x}", self.sepc))
            .field("stval", &format_args!("{:#x}", self.stval))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{T_PGFLT, T_SYSCALL};
    use crate::trap::ds::Exception;

    #[test]
    fn layout_matches_entry_stub() {
        assert_eq!(core::mem::size_of::<TrapContext>(), 38 * 8);
        assert_eq!(core::mem::size_of::<TrapContext>() % 16, 0);
        assert_eq!(core::mem::offset_of!(TrapContext, sstatus), 32 * 8);
        assert_eq!(core::mem::offset_of!(TrapContext, trapno), 36 * 8);
        assert_eq!(core::mem::offset_of!(TrapContext, kernel_hartid), 37 * 8);
    }

    #[test]
    fn privilege_comes_from_spp() {
        let user = TrapContext::with_trap(T_PGFLT, TrapCause::exception(Exception::LoadPageFault), PrivilegeLevel::User);
        assert!(user.from_user());
        let kernel = TrapContext::with_trap(T_PGFLT, TrapCause::exception(Exception::LoadPageFault), PrivilegeLevel::Kernel);
        assert_eq!(kernel.privilege(), PrivilegeLevel::Kernel);
    }

    #[test]
    fn syscall_registers() {
        let mut ctx = TrapContext::with_trap(T_SYSCALL, TrapCause::exception(Exception::UserEnvCall), PrivilegeLevel::User);
        ctx.x[17] = 7;
        ctx.x[11] = 0xabc;
        ctx.sepc = 0x1000;
        assert!(ctx.is_software_raised());
        assert_eq!(ctx.syscall_number(), 7);
        assert_eq!(ctx.arg(1), 0xabc);
        ctx.advance_sepc();
        ctx.set_return_value(42);
        assert_eq!(ctx.sepc, 0x1004);
        assert_eq!(ctx.arg(0), 42);
    }
}
