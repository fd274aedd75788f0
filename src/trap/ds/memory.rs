// nt_trapos/src/trap/ds/memory.rs

//! # Memory Handles
//!
//! Opaque handles exchanged with the frame allocator and the mapping
//! installer, plus the Sv39 leaf permission bits.

use bitflags::bitflags;

/// Root of a process page table, as the mapper understands it
/// (for Sv39, the physical page number of the root table).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PageTableHandle(pub usize);

/// One physical frame handed out by a `FrameAllocator`.
///
/// The frame is addressed through the kernel's view of physical memory; it
/// is owned by whoever holds the handle until freed or mapped.
#[derive(Debug, PartialEq, Eq)]
pub struct Frame {
    kernel_addr: usize,
}

impl Frame {
    /// # Safety
    /// `kernel_addr` must be the kernel-visible address of `PAGE_SIZE`
    /// writable bytes not referenced by anything else.
    pub const unsafe fn from_kernel_addr(kernel_addr: usize) -> Self {
        Self { kernel_addr }
    }

    pub fn kernel_addr(&self) -> usize {
        self.kernel_addr
    }

    pub(crate) fn as_mut_ptr(&self) -> *mut u8 {
        self.kernel_addr as *mut u8
    }
}

bitflags! {
    /// Sv39 page-table entry bits.
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct PteFlags: u64 {
        const VALID = 1 << 0;
        const READ = 1 << 1;
        const WRITE = 1 << 2;
        const EXEC = 1 << 3;
        const USER = 1 << 4;
        const GLOBAL = 1 << 5;
        const ACCESSED = 1 << 6;
        const DIRTY = 1 << 7;
    }
}
