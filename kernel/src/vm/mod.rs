//! C3–C6: the virtual memory subsystem. A two-level page table over a
//! single shared physical SRAM window, a write-back cache that buffers
//! evicted pages before they reach flash, a flash swap region for those
//! evictions, and the fault handler that ties bounds-checking, eviction,
//! and read-in together into one MPU-subregion-granularity operation.
//!
//! Every submodule here is hardware-independent and host-testable; the
//! only architecture-specific pieces are the `Mpu` implementation
//! (`arch_cortex_m0::mpu`) and the flash driver (`chips_rp2040::flash`),
//! both reached only through the `kernel::platform`/`kernel::vm::flash_swap`
//! trait seams.

pub mod addr;
pub mod bitmap;
pub mod fault;
pub mod flash_swap;
pub mod owner_tables;
pub mod page_table;
pub mod pte;
pub mod sram;
pub mod write_cache;

pub use fault::{vm_fault, AccessKind, FaultOutcome, VmTables};
