//! The VM-internal error taxonomy. Unlike `ReturnCode`, these never cross a
//! driver callback boundary, so there is no need to keep the enum narrow or
//! ABI-stable; every variant names one condition from the fault-handling
//! contract.

use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoneId {
    Pcb,
    PteGroup,
    PteGroupTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// A zone's free list was empty on `zalloc`.
    ZoneExhausted(ZoneId),
    /// The flash swap manager found no free page and no unerased sector.
    NoFlashSpace,
    /// The faulting address lies outside the VM-managed SRAM window.
    OutOfRangeFault,
    /// The faulting PC does not point into an executable region.
    ExecutableCheckFailed,
    /// A sector erase did not read back as all-0xFF (debug builds only).
    FlashWearFailure,
    /// A PTE, group index, or table index held a value the data model
    /// forbids; always a programming error, never a recoverable condition.
    InvariantViolation,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::ZoneExhausted(zone) => write!(f, "zone exhausted: {:?}", zone),
            KernelError::NoFlashSpace => write!(f, "no flash swap space remains"),
            KernelError::OutOfRangeFault => write!(f, "fault address outside VM window"),
            KernelError::ExecutableCheckFailed => write!(f, "faulting pc not executable"),
            KernelError::FlashWearFailure => write!(f, "sector erase left non-0xFF bytes"),
            KernelError::InvariantViolation => write!(f, "VM invariant violated"),
        }
    }
}
