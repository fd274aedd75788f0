// nt_trapos/src/trap/infrastructure/fault_resolver.rs

//! # Lazy Fault Resolver
//!
//! Backs heap pages on first touch. A fault is eligible when the address is
//! below the process's size bound and not inside the guard page just below
//! that bound. Eligible faults get a fresh zeroed frame mapped read/write
//! for user code; everything else is declined and left to the default path,
//! which kills the process.

use crate::config::{page_round_down, AllocatorMode, PAGE_SIZE};
use crate::trap::ds::{MapError, Process, PteFlags};
use crate::trap::infrastructure::di::traits::{FrameAllocator, PageMapper};
use alloc::sync::Arc;
use core::fmt;

/// Why a page fault was not resolved.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DeclineReason {
    /// The allocator runs in default mode; every page fault is fatal.
    LazyDisabled,
    /// The address is at or above the process's size bound.
    OutOfBounds,
    /// The address is inside the guard page below the bound.
    GuardPage,
    /// No physical frame was available.
    OutOfFrames,
    /// The mapping installer refused the page.
    MapFailed(MapError),
}

impl fmt::Display for DeclineReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LazyDisabled => write!(f, "lazy allocation disabled"),
            Self::OutOfBounds => write!(f, "address beyond process size"),
            Self::GuardPage => write!(f, "address in guard page"),
            Self::OutOfFrames => write!(f, "out of physical frames"),
            Self::MapFailed(e) => write!(f, "mapping failed: {}", e),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FaultOutcome {
    /// `page` is now backed by the frame at `frame_addr`; the faulting
    /// instruction re-executes on return.
    Resolved { page: usize, frame_addr: usize },
    Declined(DeclineReason),
}

impl FaultOutcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, FaultOutcome::Resolved { .. })
    }
}

pub struct LazyFaultResolver {
    frames: Arc<dyn FrameAllocator>,
    mapper: Arc<dyn PageMapper>,
}

impl LazyFaultResolver {
    pub fn new(frames: Arc<dyn FrameAllocator>, mapper: Arc<dyn PageMapper>) -> Self {
        Self { frames, mapper }
    }

    /// Permission bits of a lazily backed page. Sv39 reserves W without R.
    pub const LAZY_PAGE_FLAGS: PteFlags = PteFlags::READ.union(PteFlags::WRITE).union(PteFlags::USER);

    pub fn resolve(&self, proc: &Process, fault_addr: usize, mode: AllocatorMode) -> FaultOutcome {
        if mode != AllocatorMode::Lazy {
            return FaultOutcome::Declined(DeclineReason::LazyDisabled);
        }

        let sz = proc.size();
        let page = page_round_down(fault_addr);
        if let Some(reason) = Self::ineligible(fault_addr, page, sz) {
            return FaultOutcome::Declined(reason);
        }

        match self.back_page(proc, page) {
            Ok(frame_addr) => FaultOutcome::Resolved { page, frame_addr },
            Err(reason) => FaultOutcome::Declined(reason),
        }
    }

    fn ineligible(fault_addr: usize, page: usize, sz: usize) -> Option<DeclineReason> {
        if fault_addr >= sz {
            return Some(DeclineReason::OutOfBounds);
        }
        // With sz below one page there is no room for a guard page.
        let in_guard = sz
            .checked_sub(PAGE_SIZE)
            .is_some_and(|guard| page >= guard && page < sz);
        in_guard.then_some(DeclineReason::GuardPage)
    }

    /// Allocates, zeroes and maps one frame at `page`. Any failure after the
    /// allocation returns the frame before reporting.
    fn back_page(&self, proc: &Process, page: usize) -> Result<usize, DeclineReason> {
        let frame = self.frames.allocate_frame().ok_or(DeclineReason::OutOfFrames)?;

        // SAFETY: the allocator contract gives us exclusive access to
        // PAGE_SIZE writable bytes at the frame's kernel address.
        unsafe { core::ptr::write_bytes(frame.as_mut_ptr(), 0, PAGE_SIZE) };

        let frame_addr = frame.kernel_addr();
        if let Err(e) = self.mapper.map(proc.page_table(), page, &frame, Self::LAZY_PAGE_FLAGS) {
            self.frames.free_frame(frame);
            return Err(DeclineReason::MapFailed(e));
        }
        // The page table owns the frame now.
        Ok(frame_addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::fakes::{FakeFrameAllocator, RecordingMapper};
    use crate::trap::ds::PageTableHandle;

    fn setup(frames: usize) -> (Arc<FakeFrameAllocator>, Arc<RecordingMapper>, LazyFaultResolver) {
        let alloc = Arc::new(FakeFrameAllocator::new(frames));
        let mapper = Arc::new(RecordingMapper::new());
        let resolver = LazyFaultResolver::new(alloc.clone(), mapper.clone());
        (alloc, mapper, resolver)
    }

    fn proc_with_size(sz: usize) -> Process {
        Process::new(1, "init", sz, PageTableHandle(0x80))
    }

    #[test]
    fn heap_fault_maps_zeroed_user_page() {
        let (alloc, mapper, resolver) = setup(4);
        let proc = proc_with_size(0x3000);

        let outcome = resolver.resolve(&proc, 0x1500, AllocatorMode::Lazy);
        let FaultOutcome::Resolved { page, frame_addr } = outcome else {
            panic!("expected resolution, got {:?}", outcome);
        };
        assert_eq!(page, 0x1000);

        let mapping = mapper.lookup(PageTableHandle(0x80), 0x1000).expect("page mapped");
        assert_eq!(mapping.frame_addr, frame_addr);
        assert!(mapping.flags.contains(PteFlags::WRITE | PteFlags::USER));
        assert!(alloc.frame_is_zeroed(frame_addr));
        assert_eq!(alloc.outstanding(), 1);
    }

    #[test]
    fn guard_page_and_bound_are_declined() {
        let (alloc, mapper, resolver) = setup(4);
        let proc = proc_with_size(0x3000);

        assert_eq!(
            resolver.resolve(&proc, 0x2500, AllocatorMode::Lazy),
            FaultOutcome::Declined(DeclineReason::GuardPage)
        );
        assert_eq!(
            resolver.resolve(&proc, 0x3000, AllocatorMode::Lazy),
            FaultOutcome::Declined(DeclineReason::OutOfBounds)
        );
        assert_eq!(
            resolver.resolve(&proc, 0x4000, AllocatorMode::Lazy),
            FaultOutcome::Declined(DeclineReason::OutOfBounds)
        );
        assert!(mapper.is_empty());
        assert_eq!(alloc.outstanding(), 0);
    }

    #[test]
    fn default_mode_declines_everything() {
        let (alloc, mapper, resolver) = setup(4);
        let proc = proc_with_size(0x3000);
        assert_eq!(
            resolver.resolve(&proc, 0x1500, AllocatorMode::Default),
            FaultOutcome::Declined(DeclineReason::LazyDisabled)
        );
        assert!(mapper.is_empty());
        assert_eq!(alloc.allocations(), 0);
    }

    #[test]
    fn exhausted_allocator_declines() {
        let (_alloc, mapper, resolver) = setup(0);
        let proc = proc_with_size(0x3000);
        assert_eq!(
            resolver.resolve(&proc, 0x0800, AllocatorMode::Lazy),
            FaultOutcome::Declined(DeclineReason::OutOfFrames)
        );
        assert!(mapper.is_empty());
    }

    #[test]
    fn mapping_failure_returns_the_frame() {
        let (alloc, mapper, resolver) = setup(4);
        mapper.fail_next(MapError::OutOfMemory);
        let proc = proc_with_size(0x3000);
        assert_eq!(
            resolver.resolve(&proc, 0x0800, AllocatorMode::Lazy),
            FaultOutcome::Declined(DeclineReason::MapFailed(MapError::OutOfMemory))
        );
        assert_eq!(alloc.allocations(), 1);
        assert_eq!(alloc.outstanding(), 0);
    }

    #[test]
    fn second_fault_on_resolved_page_is_declined_as_remap() {
        // No already-mapped check happens before allocating; the mapper's
        // remap refusal is what stops a duplicate mapping.
        let (alloc, _mapper, resolver) = setup(4);
        let proc = proc_with_size(0x3000);
        assert!(resolver.resolve(&proc, 0x1500, AllocatorMode::Lazy).is_resolved());
        assert_eq!(
            resolver.resolve(&proc, 0x1800, AllocatorMode::Lazy),
            FaultOutcome::Declined(DeclineReason::MapFailed(MapError::AlreadyMapped))
        );
        assert_eq!(alloc.outstanding(), 1);
    }

    #[test]
    fn tiny_address_space_has_no_guard_page() {
        let (_alloc, _mapper, resolver) = setup(1);
        let proc = proc_with_size(0x800);
        assert!(resolver.resolve(&proc, 0x10, AllocatorMode::Lazy).is_resolved());
    }

    #[test]
    fn unaligned_bound_guards_the_page_overlapping_the_last_page_size_bytes() {
        let (_alloc, _mapper, resolver) = setup(4);
        let proc = proc_with_size(0x3800);
        // guard window starts at 0x2800, so page 0x3000 is guarded and 0x2000 is not
        assert_eq!(
            resolver.resolve(&proc, 0x3100, AllocatorMode::Lazy),
            FaultOutcome::Declined(DeclineReason::GuardPage)
        );
        assert!(resolver.resolve(&proc, 0x2900, AllocatorMode::Lazy).is_resolved());
    }
}
