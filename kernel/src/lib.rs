//! Kernel crate: the hardware-independent core of the virtual memory
//! subsystem, the zone allocator, the process/scheduler substrate, and the
//! handful of HIL traits chip and arch crates implement against.
//!
//! Built `no_std` for the embedded target; compiled with `std` under
//! `cargo test` so the VM logic (all array/bitmap based, no heap) can be
//! exercised on the host.

#![cfg_attr(not(test), no_std)]

pub mod capabilities;
pub mod common;
pub mod config;
pub mod debug;
pub mod error;
pub mod hil;
pub mod platform;
pub mod process;
pub mod returncode;
pub mod sched;
pub mod syscall;
pub mod vm;
pub mod zone;

pub use returncode::ReturnCode;
