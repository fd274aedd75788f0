// nt_trapos/src/trap/infrastructure/di/mod.rs

//! # Dependency Injection System - Global Access and Initialization
//!
//! Manages the global instance of the `TrapSystem` and provides safe
//! mechanisms for its initialization and access.

pub mod container;
pub mod traits;

pub use self::container::{TrapDeps, TrapSystem};

use crate::trap::ds::{TrapContext, TrapMode};
use core::sync::atomic::{AtomicBool, Ordering};
use spin::Once;

/// The global `TrapSystem`. Written once at boot, read-only afterwards.
static GLOBAL_TRAP_SYSTEM: Once<TrapSystem> = Once::new();

/// Flag to ensure the trap system is initialized only once.
static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Returned when the global trap system was already built.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AlreadyInitialized;

/// Builds the global trap system from `deps` and loads the trap vector on
/// the calling hart.
///
/// Must run once during kernel startup, after the heap is available and
/// before interrupts are enabled.
pub fn initialize_trap_system(
    deps: TrapDeps,
    mode: TrapMode,
) -> Result<&'static TrapSystem, AlreadyInitialized> {
    if INITIALIZED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
        .is_err()
    {
        return Err(AlreadyInitialized);
    }

    let trap_system = GLOBAL_TRAP_SYSTEM.call_once(|| TrapSystem::new(deps));
    trap_system.initialize(mode);
    Ok(trap_system)
}

/// The global trap system, if it has been built.
pub fn trap_system() -> Option<&'static TrapSystem> {
    GLOBAL_TRAP_SYSTEM.get()
}

/// Runs `f` against the global `TrapSystem`; `None` before initialization.
pub fn with_trap_system<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&TrapSystem) -> R,
{
    trap_system().map(f)
}

/// Checks if the trap system has been initialized.
pub fn is_initialized() -> bool {
    GLOBAL_TRAP_SYSTEM.is_completed()
}

/// Bridge from the assembly entry path to the Rust dispatcher.
#[cfg_attr(not(target_arch = "riscv64"), allow(dead_code))]
pub(crate) fn dispatch_trap(context: &mut TrapContext) {
    match trap_system() {
        Some(ts) => ts.dispatch_current(context),
        None => panic!("trap {} before trap system initialization: {:?}", context.trapno, context),
    }
}
