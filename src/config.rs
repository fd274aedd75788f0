// nt_trapos/src/config.rs

//! # Kernel Configuration
//!
//! Compile-time constants for memory layout, trap vector numbering and the
//! QEMU `virt` board, plus the runtime `KernelConfig` that carries the
//! process-wide page allocator mode.

use core::str::FromStr;
use core::sync::atomic::{AtomicU8, Ordering};

/// Size of a virtual page and of a physical frame.
pub const PAGE_SIZE: usize = 4096;

/// Number of slots in the trap vector table.
pub const NVECTORS: usize = 256;

/// Boot stack size per hart (16KB).
pub const STACK_SIZE: usize = 4096 * 4;

/// Kernel heap size (2MB).
pub const KERNEL_HEAP_SIZE: usize = 2 * 1024 * 1024;

// Processor-defined trap numbers. The numbering follows the classic PC layout
// so that vector numbers stay stable across ports.
pub const T_BRKPT: usize = 3;
pub const T_ILLOP: usize = 6;
pub const T_GPFLT: usize = 13;
pub const T_PGFLT: usize = 14;
pub const T_ALIGN: usize = 17;

/// System call vector; the only gate reachable from user privilege.
pub const T_SYSCALL: usize = 64;
/// Catch-all for causes with no vector of their own. Deliberately outside the table.
pub const T_DEFAULT: usize = 500;

/// First vector used for device interrupts: IRQ n arrives as `T_IRQ0 + n`.
pub const T_IRQ0: usize = 32;

pub const IRQ_TIMER: usize = 0;
pub const IRQ_KBD: usize = 1;
pub const IRQ_COM1: usize = 4;
/// Legacy spurious line of the primary controller.
pub const IRQ_LEGACY_SPURIOUS: usize = 7;
pub const IRQ_IDE: usize = 14;
pub const IRQ_SPURIOUS: usize = 31;

/// Harts supported by the PLIC bookkeeping.
pub const MAX_HARTS: usize = 8;

/// The one processor allowed to advance the tick clock.
pub const TIMER_OWNER_CPU: usize = 0;

/// Timer frequency of the QEMU `virt` board (10MHz).
pub const CLOCK_FREQ: u64 = 10_000_000;
/// Timer interrupts per second.
pub const TICKS_PER_SEC: u64 = 100;

/// PLIC layout on the QEMU `virt` board.
pub const PLIC_BASE: usize = 0x0c00_0000;
pub const VIRTIO0_IRQ: u32 = 1;
pub const VIRTIO1_IRQ: u32 = 2;
pub const VIRTIO_INPUT_IRQ: u32 = 3;
pub const UART0_IRQ: u32 = 10;

/// Page allocation policy for user address spaces.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum AllocatorMode {
    /// Every page is backed eagerly; a page fault is fatal to the process.
    Default = 0,
    /// Heap pages below the address-space bound are backed on first touch.
    Lazy = 1,
}

impl AllocatorMode {
    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => AllocatorMode::Lazy,
            _ => AllocatorMode::Default,
        }
    }
}

/// Error returned when a boot argument does not name an allocator mode.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ParseModeError;

impl FromStr for AllocatorMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "default" | "0" => Ok(AllocatorMode::Default),
            "lazy" | "1" => Ok(AllocatorMode::Lazy),
            _ => Err(ParseModeError),
        }
    }
}

/// Runtime configuration shared by every hart.
///
/// The dispatcher only reads it; the owner (boot code or a system call)
/// flips the allocator mode.
#[derive(Debug)]
pub struct KernelConfig {
    allocator_mode: AtomicU8,
}

impl KernelConfig {
    pub const fn new(mode: AllocatorMode) -> Self {
        Self {
            allocator_mode: AtomicU8::new(mode as u8),
        }
    }

    /// Builds a configuration from a boot command line such as
    /// `"console=sbi page_allocator=lazy"`. Unknown keys are ignored and a
    /// malformed or missing allocator entry keeps the default mode.
    pub fn from_bootargs(args: &str) -> Self {
        let mode = args
            .split_whitespace()
            .filter_map(|kv| kv.split_once('='))
            .find(|(key, _)| *key == "page_allocator")
            .and_then(|(_, value)| value.parse().ok())
            .unwrap_or(AllocatorMode::Default);
        Self::new(mode)
    }

    pub fn allocator_mode(&self) -> AllocatorMode {
        AllocatorMode::from_raw(self.allocator_mode.load(Ordering::Acquire))
    }

    pub fn set_allocator_mode(&self, mode: AllocatorMode) {
        self.allocator_mode.store(mode as u8, Ordering::Release);
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self::new(AllocatorMode::Default)
    }
}

/// Rounds an address down to the start of its page.
#[inline]
pub const fn page_round_down(addr: usize) -> usize {
    addr & !(PAGE_SIZE - 1)
}

/// Rounds an address up to the next page boundary.
#[inline]
pub const fn page_round_up(addr: usize) -> usize {
    (addr + PAGE_SIZE - 1) & !(PAGE_SIZE - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_rounding() {
        assert_eq!(page_round_down(0x1500), 0x1000);
        assert_eq!(page_round_down(0x1000), 0x1000);
        assert_eq!(page_round_up(0x1001), 0x2000);
        assert_eq!(page_round_up(0x2000), 0x2000);
    }

    #[test]
    fn boot_stack_keeps_alignment() {
        // `_start` reserves STACK_SIZE bytes and points sp at the top.
        assert_eq!(STACK_SIZE % PAGE_SIZE, 0);
        assert_eq!(page_round_up(STACK_SIZE), STACK_SIZE);
    }

    #[test]
    fn allocator_mode_parses_names_and_digits() {
        assert_eq!("lazy".parse(), Ok(AllocatorMode::Lazy));
        assert_eq!("1".parse(), Ok(AllocatorMode::Lazy));
        assert_eq!(" default ".parse(), Ok(AllocatorMode::Default));
        assert_eq!("eager".parse::<AllocatorMode>(), Err(ParseModeError));
    }

    #[test]
    fn bootargs_select_mode() {
        let cfg = KernelConfig::from_bootargs("console=sbi page_allocator=lazy");
        assert_eq!(cfg.allocator_mode(), AllocatorMode::Lazy);

        let cfg = KernelConfig::from_bootargs("page_allocator=bogus");
        assert_eq!(cfg.allocator_mode(), AllocatorMode::Default);

        let cfg = KernelConfig::from_bootargs("");
        assert_eq!(cfg.allocator_mode(), AllocatorMode::Default);
    }

    #[test]
    fn mode_flag_is_mutable_through_shared_reference() {
        let cfg = KernelConfig::default();
        cfg.set_allocator_mode(AllocatorMode::Lazy);
        assert_eq!(cfg.allocator_mode(), AllocatorMode::Lazy);
        cfg.set_allocator_mode(AllocatorMode::Default);
        assert_eq!(cfg.allocator_mode(), AllocatorMode::Default);
    }
}
