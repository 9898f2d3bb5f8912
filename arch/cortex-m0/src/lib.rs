//! Cortex-M0 architecture support: the `kernel::platform::mpu::Mpu` and
//! `kernel::platform::ContextSwitch` implementations, plus the exception
//! handlers (`MemoryManagement`, `SVCall`, `PendSV`, `SysTick`) that drive
//! the fault-driven VM scheme and the round-robin scheduler from hardware.
//!
//! Nothing in `kernel` depends on this crate; it is reached only through
//! the trait seams `kernel::platform` defines, so a board picks exactly one
//! architecture crate to link against.

#![cfg_attr(not(test), no_std)]

pub mod context_switch;
pub mod fault;
pub mod mpu;

pub use context_switch::Cortexm0ContextSwitch;
pub use mpu::Cortexm0Mpu;
