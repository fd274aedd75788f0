// nt_trapos/src/trap/infrastructure/low_level.rs

//! # Low-Level Trap Hardware Control
//!
//! The trap entry stub, direct control over the trap-related CSRs, and the
//! PLIC on the QEMU `virt` board. Only `external_vector` is portable; the
//! rest exists on RISC-V targets.

use crate::config::*;

/// Translates a PLIC source line into the vector the dispatcher services.
/// Line 0 means the claim found nothing pending.
pub fn external_vector(line: u32) -> usize {
    match line {
        0 => T_IRQ0 + IRQ_SPURIOUS,
        VIRTIO0_IRQ => T_IRQ0 + IRQ_IDE,
        VIRTIO1_IRQ => T_IRQ0 + IRQ_IDE + 1,
        VIRTIO_INPUT_IRQ => T_IRQ0 + IRQ_KBD,
        UART0_IRQ => T_IRQ0 + IRQ_COM1,
        other => T_IRQ0 + other as usize,
    }
}

/// Marks a hart that has not claimed from the PLIC during the current trap.
pub const NO_CLAIM: u32 = u32::MAX;

/// Offset from `PLIC_BASE` of the S-mode enable bits for `hart`.
pub fn plic_senable_offset(hart: usize) -> Option<usize> {
    (hart < MAX_HARTS).then(|| 0x2080 + hart * 0x100)
}

/// Offset from `PLIC_BASE` of the S-mode priority threshold for `hart`.
pub fn plic_sthreshold_offset(hart: usize) -> Option<usize> {
    (hart < MAX_HARTS).then(|| 0x20_1000 + hart * 0x2000)
}

/// Offset from `PLIC_BASE` of the S-mode claim/complete register for `hart`.
pub fn plic_sclaim_offset(hart: usize) -> Option<usize> {
    plic_sthreshold_offset(hart).map(|threshold| threshold + 4)
}

/// Hart mask selecting every supported hart except `hart`.
pub fn other_harts_mask(hart: usize) -> usize {
    let all = (1usize << MAX_HARTS) - 1;
    if hart < MAX_HARTS {
        all & !(1 << hart)
    } else {
        all
    }
}

/// Work needed to acknowledge an interrupt.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Acknowledge {
    /// Re-arm the SBI timer, which also clears the pending timer bit.
    RearmTimer,
    /// Clear `sip.SSIP`.
    ClearSoftPending,
    /// Write the claimed line back to the claim/complete register.
    Complete(u32),
    /// The claim returned nothing.
    Nothing,
}

/// Decides how to acknowledge `vector` given the line the hart claimed
/// during this trap (`NO_CLAIM` when it did not claim at all).
pub fn acknowledgement(vector: usize, claimed: u32) -> Acknowledge {
    if vector == T_IRQ0 + IRQ_TIMER {
        return Acknowledge::RearmTimer;
    }
    match claimed {
        NO_CLAIM if vector == T_IRQ0 + IRQ_SPURIOUS => Acknowledge::ClearSoftPending,
        NO_CLAIM | 0 => Acknowledge::Nothing,
        line => Acknowledge::Complete(line),
    }
}

#[cfg(target_arch = "riscv64")]
pub use self::riscv_impl::*;

#[cfg(target_arch = "riscv64")]
mod riscv_impl {
    use super::{
        acknowledgement, external_vector, other_harts_mask, plic_sclaim_offset,
        plic_senable_offset, plic_sthreshold_offset, Acknowledge, NO_CLAIM,
    };
    use crate::config::*;
    use crate::trap::ds::{TrapContext, TrapMode};
    use crate::trap::infrastructure::di::traits::{HardwareController, InterruptController};
    use crate::util::sbi;
    use core::arch::{asm, global_asm};
    use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    const SSTATUS_SIE: usize = 1 << 1;
    const SIE_SSIE: usize = 1 << 1;
    const SIE_STIE: usize = 1 << 5;
    const SIE_SEIE: usize = 1 << 9;
    const SIP_SSIP: usize = 1 << 1;

    // Trap entry and exit.
    //
    // sscratch holds the kernel stack top while user code runs and 0 while
    // the kernel runs. The stub builds a TrapContext (38 words) on the kernel
    // stack and passes it to `handle_trap`. A user frame always sits right
    // under the stack top, so its `kernel_hartid` word (37) survives between
    // the exit to user mode and the next entry; `tp` is reloaded from it.
    global_asm!(
        r#"
    .altmacro
    .macro SAVE_GP n
        sd x\n, \n*8(sp)
    .endm
    .macro LOAD_GP n
        ld x\n, \n*8(sp)
    .endm

    .section .text
    .globl __trap_entry
    .globl __trap_return
    .align 2
__trap_entry:
    csrrw sp, sscratch, sp
    bnez sp, 1f
    csrrw sp, sscratch, sp
1:
    addi sp, sp, -38*8
    sd x1, 1*8(sp)
    .set n, 3
    .rept 29
        SAVE_GP %n
        .set n, n+1
    .endr

    csrr t0, sstatus
    csrr t1, sepc
    csrr t2, scause
    csrr t3, stval
    sd t0, 32*8(sp)
    sd t1, 33*8(sp)
    sd t2, 34*8(sp)
    sd t3, 35*8(sp)

    csrr t0, sscratch
    bnez t0, 2f
    addi t0, sp, 38*8
    j 3f
2:
    ld tp, 37*8(sp)
3:
    sd t0, 2*8(sp)
    csrw sscratch, zero

    mv a0, sp
    call handle_trap

__trap_return:
    ld t0, 32*8(sp)
    ld t1, 33*8(sp)
    csrw sstatus, t0
    csrw sepc, t1
    andi t0, t0, 1 << 8
    bnez t0, 4f
    addi t1, sp, 38*8
    csrw sscratch, t1
    sd tp, 37*8(sp)
4:
    ld x1, 1*8(sp)
    .set n, 3
    .rept 29
        LOAD_GP %n
        .set n, n+1
    .endr
    ld sp, 2*8(sp)
    sret
"#
    );

    extern "C" {
        fn __trap_entry();
    }

    /// Line claimed from the PLIC by each hart, completed at end-of-interrupt.
    static CLAIMED: [AtomicU32; MAX_HARTS] = [const { AtomicU32::new(NO_CLAIM) }; MAX_HARTS];

    /// Set once any hart halts the kernel.
    static HALTED: AtomicBool = AtomicBool::new(false);

    /// Id of the calling hart. Set in `tp` at boot and reloaded by the entry
    /// stub on every trap from user mode.
    #[inline]
    pub fn hart_id() -> usize {
        let id: usize;
        unsafe { asm!("mv {}, tp", out(reg) id) };
        id
    }

    /// Sets `stvec` to the entry stub and marks the hart as running kernel code.
    pub fn init_trap_vector(mode: TrapMode) {
        let stvec_value = __trap_entry as usize | mode as usize;
        unsafe {
            asm!("csrw stvec, {}", in(reg) stvec_value);
            asm!("csrw sscratch, zero");
        }
    }

    /// Target of the `call` in `__trap_entry`.
    ///
    /// # Safety
    ///
    /// Only the entry stub calls this; `context` points at the frame it just
    /// built on the kernel stack.
    #[no_mangle]
    pub unsafe extern "C" fn handle_trap(context: *mut TrapContext) {
        if HALTED.load(Ordering::Acquire) {
            park();
        }
        let tf = &mut *context;
        tf.trapno = tf.cause().to_vector(|| Plic.claim(hart_id()));
        crate::trap::infrastructure::di::dispatch_trap(tf);
    }

    /// Enables supervisor-level interrupts on the current hart.
    /// Returns `true` if interrupts were previously enabled.
    #[inline]
    pub fn enable_interrupts() -> bool {
        let sstatus: usize;
        unsafe { asm!("csrrs {}, sstatus, {}", out(reg) sstatus, in(reg) SSTATUS_SIE) };
        sstatus & SSTATUS_SIE != 0
    }

    /// Disables supervisor-level interrupts on the current hart.
    /// Returns `true` if interrupts were previously enabled.
    #[inline]
    pub fn disable_interrupts() -> bool {
        let sstatus: usize;
        unsafe { asm!("csrrc {}, sstatus, {}", out(reg) sstatus, in(reg) SSTATUS_SIE) };
        sstatus & SSTATUS_SIE != 0
    }

    #[inline]
    pub fn restore_interrupts(was_enabled: bool) {
        if was_enabled {
            unsafe { asm!("csrs sstatus, {}", in(reg) SSTATUS_SIE) };
        } else {
            unsafe { asm!("csrc sstatus, {}", in(reg) SSTATUS_SIE) };
        }
    }

    /// Stops the calling hart for good.
    pub fn park() -> ! {
        disable_interrupts();
        loop {
            unsafe { asm!("wfi") };
        }
    }

    /// Whether some hart has halted the kernel.
    pub fn is_halted() -> bool {
        HALTED.load(Ordering::Acquire)
    }

    /// Stops the whole machine. The first caller publishes the halt and
    /// sends a software interrupt to every other hart, which parks on its
    /// next trap; the caller parks immediately.
    pub fn halt_all_harts() -> ! {
        disable_interrupts();
        if !HALTED.swap(true, Ordering::AcqRel) {
            let _ = sbi::ipi::send_ipi(other_harts_mask(hart_id()));
        }
        park()
    }

    /// Unmasks timer, external and software interrupts in `sie`.
    pub fn enable_interrupt_sources() {
        unsafe { asm!("csrs sie, {}", in(reg) SIE_SSIE | SIE_STIE | SIE_SEIE) };
    }

    /// The hart's trap hardware.
    pub struct RiscvHardware;

    impl HardwareController for RiscvHardware {
        fn init_trap_vector(&self, mode: TrapMode) {
            init_trap_vector(mode);
        }
        fn trap_entry(&self) -> usize {
            __trap_entry as usize
        }
        fn enable_interrupts(&self) -> bool {
            enable_interrupts()
        }
        fn disable_interrupts(&self) -> bool {
            disable_interrupts()
        }
        fn restore_interrupts(&self, was_enabled: bool) {
            restore_interrupts(was_enabled);
        }
    }

    /// Platform-level interrupt controller of the `virt` board, S-mode contexts.
    pub struct Plic;

    impl Plic {
        const DEVICE_LINES: [u32; 4] = [VIRTIO0_IRQ, VIRTIO1_IRQ, VIRTIO_INPUT_IRQ, UART0_IRQ];

        fn reg(offset: usize) -> *mut u32 {
            (PLIC_BASE + offset) as *mut u32
        }

        fn senable(hart: usize) -> Option<*mut u32> {
            plic_senable_offset(hart).map(Self::reg)
        }

        fn sthreshold(hart: usize) -> Option<*mut u32> {
            plic_sthreshold_offset(hart).map(Self::reg)
        }

        fn sclaim(hart: usize) -> Option<*mut u32> {
            plic_sclaim_offset(hart).map(Self::reg)
        }

        /// Gives every known device line priority 1; done once at boot.
        pub fn init(&self) {
            for line in Self::DEVICE_LINES {
                unsafe { Self::reg(line as usize * 4).write_volatile(1) };
            }
        }

        /// Enables the device lines for `hart`'s S-mode context.
        pub fn init_hart(&self, hart: usize) {
            let (Some(enable), Some(threshold)) = (Self::senable(hart), Self::sthreshold(hart))
            else {
                return;
            };
            let mask = Self::DEVICE_LINES.iter().fold(0u32, |m, &line| m | (1 << line));
            unsafe {
                enable.write_volatile(mask);
                threshold.write_volatile(0);
            }
        }

        /// Claims the highest-priority pending line and returns its vector.
        pub fn claim(&self, hart: usize) -> usize {
            let (Some(claim), Some(slot)) = (Self::sclaim(hart), CLAIMED.get(hart)) else {
                return external_vector(0);
            };
            let line = unsafe { claim.read_volatile() };
            slot.store(line, Ordering::Relaxed);
            external_vector(line)
        }
    }

    impl InterruptController for Plic {
        fn end_of_interrupt(&self, cpu: usize, vector: usize) {
            let claimed = CLAIMED
                .get(cpu)
                .map_or(NO_CLAIM, |slot| slot.swap(NO_CLAIM, Ordering::Relaxed));
            match acknowledgement(vector, claimed) {
                Acknowledge::RearmTimer => {
                    let _ = sbi::timer::arm_next_tick();
                }
                Acknowledge::ClearSoftPending => unsafe {
                    asm!("csrc sip, {}", in(reg) SIP_SSIP);
                },
                Acknowledge::Complete(line) => {
                    if let Some(claim) = Self::sclaim(cpu) {
                        unsafe { claim.write_volatile(line) };
                    }
                }
                Acknowledge::Nothing => {}
            }
        }
    }
}
