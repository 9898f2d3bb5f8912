//! `kernel::platform::Chip` for the RP2040: bundles the Cortex-M0+ MPU and
//! context switch implementations from `arch_cortex_m0` with this chip's
//! idle/atomic-section behavior. Grounded on the `kernel::platform::Chip`
//! trait's own doc comment for what a chip needs to provide, since no file
//! in this tree wires a `Chip` impl at the board-integration level already.

use arch_cortex_m0::{Cortexm0ContextSwitch, Cortexm0Mpu};
use kernel::platform::Chip;

pub struct Rp2040Chip {
    context_switch: Cortexm0ContextSwitch,
}

impl Rp2040Chip {
    /// # Safety
    /// Must be constructed at most once; see `Cortexm0Mpu::new` and
    /// `Cortexm0ContextSwitch::new`. The single `Cortexm0Mpu` built here
    /// lives inside `context_switch`; `Chip::mpu()` delegates to it rather
    /// than this chip holding a second handle onto the same registers.
    pub const unsafe fn new() -> Rp2040Chip {
        let mpu = Cortexm0Mpu::new();
        Rp2040Chip { context_switch: Cortexm0ContextSwitch::new(mpu) }
    }
}

impl Chip for Rp2040Chip {
    type MPU = Cortexm0Mpu;
    type ContextSwitch = Cortexm0ContextSwitch;

    fn mpu(&self) -> &Cortexm0Mpu {
        self.context_switch.mpu()
    }

    fn context_switch(&self) -> &Cortexm0ContextSwitch {
        &self.context_switch
    }

    fn has_pending_interrupts(&self) -> bool {
        // This board's only interrupt sources (SysTick, PendSV, the memory
        // management fault) are serviced synchronously in their own
        // handlers (`arch_cortex_m0::fault`); none of them defer work to be
        // picked up from the idle loop.
        false
    }

    fn service_pending_interrupts(&self) {}

    fn sleep(&self) {
        cortex_m::asm::wfi();
    }

    fn atomic<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        cortex_m::interrupt::free(|_| f())
    }
}
