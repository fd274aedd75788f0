// nt_trapos/src/trap/infrastructure/mod.rs

//! # Trap Infrastructure Module
//!
//! The dispatcher and its dependency-injection wiring, the lazy fault
//! resolver, the fault journal, and the low-level hardware layer.

// The Dependency Injection (DI) framework.
pub mod di;

// Low-level hardware interaction layer.
pub mod low_level;

pub mod error_manager;
pub mod fault_resolver;

pub use di::initialize_trap_system;
