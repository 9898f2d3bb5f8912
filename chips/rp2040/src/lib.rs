//! RP2040 chip support: the flash driver and the `kernel::platform::Chip`
//! wiring around `arch_cortex_m0`.

#![cfg_attr(not(test), no_std)]

pub mod chip;
pub mod flash;

pub use chip::Rp2040Chip;
pub use flash::{Flash, Rp2040FlashBackend, Rp2040Page};
