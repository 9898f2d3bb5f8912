//! Cell types used throughout the kernel to share state across interrupt
//! contexts without heap allocation or locks.

#![no_std]

pub mod optional_cell;
pub mod take_cell;
pub mod volatile_cell;

pub use optional_cell::OptionalCell;
pub use take_cell::TakeCell;
pub use volatile_cell::VolatileCell;
