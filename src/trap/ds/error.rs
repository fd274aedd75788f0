// nt_trapos/src/trap/ds/error.rs

//! # Error Handling Data Structures
//!
//! Defines the types used to describe trap diagnostics. Every fault the
//! dispatcher acts on is recorded as a `SystemError` so it can be examined
//! after the fact.

use core::fmt;
use alloc::string::String;

/// Defines the severity of an error.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ErrorLevel {
    /// An unrecoverable error requiring a system halt.
    Fatal = 0,
    /// A serious error that terminates a process.
    Critical = 1,
    /// A standard error that can likely be handled.
    Error = 2,
    /// A potential issue that does not prevent correct operation but should be noted.
    Warning = 3,
    /// An informational message.
    Info = 4,
}

/// Identifies the subsystem where an error originated.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorSource {
    Unknown = 0,
    Trap = 2,
    Memory = 3,
    Process = 4,
    Device = 6,
    Syscall = 8,
}

/// Specific diagnostic numbers carried in the low half of an `ErrorCode`.
pub mod codes {
    /// Unexpected trap with no process or in kernel privilege.
    pub const UNEXPECTED_TRAP: u16 = 1;
    /// Unhandled trap attributed to a user process, which is killed.
    pub const USER_TRAP: u16 = 2;
    /// Page fault while the lazy allocator is disabled.
    pub const LAZY_DISABLED: u16 = 3;
    /// Page fault outside the lazily backed range.
    pub const UNHANDLED_PAGE_FAULT: u16 = 4;
    /// No physical frame available for a lazy page.
    pub const FRAME_EXHAUSTED: u16 = 5;
    /// The page mapping could not be installed.
    pub const MAP_FAILED: u16 = 6;
    /// Spurious interrupt, acknowledged and ignored.
    pub const SPURIOUS_INTERRUPT: u16 = 7;
    /// System call issued by a process already marked killed.
    pub const KILLED_AT_SYSCALL: u16 = 8;
}

/// A structured error code, combining source, level, and a specific code.
/// Format: 32-bit integer
/// - Bits 24-31: `ErrorSource`
/// - Bits 16-23: `ErrorLevel`
/// - Bits 0-15:  Specific error number
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct ErrorCode(u32);

impl ErrorCode {
    /// Creates a new `ErrorCode`.
    pub const fn new(source: ErrorSource, level: ErrorLevel, code: u16) -> Self {
        Self(((source as u32) << 24) | ((level as u32) << 16) | (code as u32))
    }

    /// Returns the `ErrorSource` part of the code.
    pub fn source(&self) -> ErrorSource {
        match (self.0 >> 24) as u8 {
            2 => ErrorSource::Trap,
            3 => ErrorSource::Memory,
            4 => ErrorSource::Process,
            6 => ErrorSource::Device,
            8 => ErrorSource::Syscall,
            _ => ErrorSource::Unknown,
        }
    }

    /// Returns the `ErrorLevel` part of the code.
    pub fn level(&self) -> ErrorLevel {
        match ((self.0 >> 16) & 0xFF) as u8 {
            0 => ErrorLevel::Fatal,
            1 => ErrorLevel::Critical,
            2 => ErrorLevel::Error,
            3 => ErrorLevel::Warning,
            4 => ErrorLevel::Info,
            _ => ErrorLevel::Error, // Default to a safe value.
        }
    }

    /// Returns the specific error number.
    pub fn number(&self) -> u16 {
        (self.0 & 0xFFFF) as u16
    }

    /// Checks if the error is fatal.
    pub fn is_fatal(&self) -> bool {
        self.level() == ErrorLevel::Fatal
    }
}

impl fmt::Debug for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ErrorCode({:?}|{:?}|{})",
            self.source(),
            self.level(),
            self.number()
        )
    }
}

/// Represents a complete trap diagnostic, with context.
#[derive(Debug, Clone)]
pub struct SystemError {
    /// The structured error code.
    pub code: ErrorCode,
    /// A descriptive message about the error.
    pub message: String,
    /// The address associated with the error (e.g., faulting address), if any.
    pub address: Option<usize>,
    /// The instruction pointer where the error occurred.
    pub instruction_pointer: usize,
    /// Tick count when the error was recorded.
    pub timestamp: u64,
}

impl SystemError {
    /// Creates a new `SystemError`.
    pub fn new(
        code: ErrorCode,
        message: impl Into<String>,
        address: Option<usize>,
        instruction_pointer: usize,
        timestamp: u64,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            address,
            instruction_pointer,
            timestamp,
        }
    }
}

impl fmt::Display for SystemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SystemError {:?} at IP={:#x}: {}",
            self.code, self.instruction_pointer, self.message
        )?;
        if let Some(addr) = self.address {
            write!(f, " (address: {:#x})", addr)?;
        }
        Ok(())
    }
}

/// Failure reported by the page mapping installer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MapError {
    /// The virtual page already has a valid mapping.
    AlreadyMapped,
    /// An intermediate page-table page could not be allocated.
    OutOfMemory,
    /// The virtual address is outside the translatable range.
    InvalidAddress,
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyMapped => write!(f, "page already mapped"),
            Self::OutOfMemory => write!(f, "out of page-table memory"),
            Self::InvalidAddress => write!(f, "invalid virtual address"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn error_code_packs_fields() {
        let code = ErrorCode::new(ErrorSource::Memory, ErrorLevel::Critical, codes::MAP_FAILED);
        assert_eq!(code.source(), ErrorSource::Memory);
        assert_eq!(code.level(), ErrorLevel::Critical);
        assert_eq!(code.number(), codes::MAP_FAILED);
        assert!(!code.is_fatal());
        assert!(ErrorCode::new(ErrorSource::Trap, ErrorLevel::Fatal, 1).is_fatal());
    }

    #[test]
    fn display_includes_address() {
        let err = SystemError::new(
            ErrorCode::new(ErrorSource::Memory, ErrorLevel::Critical, codes::UNHANDLED_PAGE_FAULT),
            "unhandled page fault",
            Some(0x2500),
            0x40,
            3,
        );
        let text = err.to_string();
        assert!(text.contains("IP=0x40"));
        assert!(text.contains("address: 0x2500"));
    }
}
