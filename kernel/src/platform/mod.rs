//! Traits a board crate assembles an instance of: `Chip` ties together the
//! MPU and interrupt handling for one microcontroller, `Platform` ties a
//! chip to the process set the scheduler drives.

pub mod mpu;

use crate::process::{Pcb, ProcessType};
use crate::syscall::ContextSwitchReason;

/// The architecture-specific half of a context switch: saving/restoring the
/// software register set and returning control to a process's saved stack
/// pointer. Implemented once per architecture crate (naked assembly); never
/// implemented in terms of the kernel crate's own types beyond `Pcb`.
pub trait ContextSwitch {
    /// # Safety
    /// `pcb` must be a process currently off the hardware thread (its
    /// `saved_sp` must point at a valid saved frame) and must not be
    /// switched to concurrently from another context.
    unsafe fn switch_to_process(&self, pcb: &mut Pcb) -> ContextSwitchReason;
}

pub trait Chip {
    type MPU: mpu::Mpu;
    type ContextSwitch: ContextSwitch;

    fn mpu(&self) -> &Self::MPU;
    fn context_switch(&self) -> &Self::ContextSwitch;
    fn has_pending_interrupts(&self) -> bool;
    fn service_pending_interrupts(&self);
    fn sleep(&self);

    /// Runs `f` with interrupts held off the whole time.
    fn atomic<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R;
}

pub trait Platform {
    fn with_process<F>(&self, process_id: u8, f: F)
    where
        F: FnOnce(Option<&dyn ProcessType>);
}
