//! `kernel::platform::ContextSwitch`: the architecture-specific half of
//! running a process — disable every subregion so the incoming process
//! faults its way back in page by page, restore its saved stack pointer,
//! and drop into thread mode via `svc`. Grounded on Hubris's
//! `start_first_task` (`msr PSP`, restore callee-saved registers, `svc`,
//! branch into user mode) simplified to this kernel's single always-saved
//! frame instead of a lazy-stacking FPU/PSP split.

use kernel::platform::mpu::Mpu;
use kernel::platform::ContextSwitch;
use kernel::process::{Pcb, ProcessType};
use kernel::syscall::ContextSwitchReason;

use crate::fault::{self, set_active_process_id};
use crate::mpu::Cortexm0Mpu;

pub struct Cortexm0ContextSwitch {
    mpu: Cortexm0Mpu,
}

impl Cortexm0ContextSwitch {
    /// # Safety
    /// Must be constructed at most once, for the same reason
    /// `Cortexm0Mpu::new` must be.
    pub const unsafe fn new(mpu: Cortexm0Mpu) -> Cortexm0ContextSwitch {
        Cortexm0ContextSwitch { mpu }
    }

    /// The single `Cortexm0Mpu` this context switch was built with. Lets a
    /// `Chip` impl expose `mpu()` without constructing a second handle onto
    /// the same hardware (there is only one MPU; `Cortexm0Mpu::new` must not
    /// be called more than once).
    pub fn mpu(&self) -> &Cortexm0Mpu {
        &self.mpu
    }
}

/// Words in a freshly synthesized process frame: the software-saved
/// `r8-r11`/`r4-r7` block `switch_to_user_thread` pops before its `svc`,
/// followed by the hardware-format `r0-r3,r12,lr,pc,psr` block the first
/// exception return out of `SVCall` pops.
const INITIAL_FRAME_WORDS: usize = 16;

/// Builds a fresh process's initial saved-context frame at the top of
/// `stack_top` and returns its base, to be stored as `Pcb::saved_sp`. Per
/// §4.8 step 4: integer registers start at zero, `pc` is the entry point
/// with the thumb bit set (required on every Cortex-M exception return),
/// `psr` is `kernel::config::INITIAL_PSR`.
///
/// # Safety
/// `stack_top` must be the exclusive top of a page that has already been
/// fault-mapped writable for this process (§4.8 step 3) — this function
/// writes `INITIAL_FRAME_WORDS * 4` bytes immediately below it.
pub unsafe fn initial_stack_frame(stack_top: usize, entry_point: usize) -> usize {
    let frame_base = stack_top - INITIAL_FRAME_WORDS * core::mem::size_of::<u32>();
    let frame = frame_base as *mut u32;

    // r8-r11, r4-r7, r0-r3, r12: all zero for a process that has never run.
    for i in 0..13 {
        core::ptr::write_volatile(frame.add(i), 0);
    }
    // lr: no caller to return to on first entry.
    core::ptr::write_volatile(frame.add(13), 0);
    // pc: thumb bit (bit 0) set, or the core hard-faults on exception return.
    core::ptr::write_volatile(frame.add(14), (entry_point | 1) as u32);
    core::ptr::write_volatile(frame.add(15), kernel::config::INITIAL_PSR);

    frame_base
}

impl ContextSwitch for Cortexm0ContextSwitch {
    unsafe fn switch_to_process(&self, pcb: &mut Pcb) -> ContextSwitchReason {
        // Every subregion starts disabled; the process re-establishes its
        // working set one MPU fault at a time (§4.6), rather than this
        // kernel tracking and eagerly restoring a working set itself.
        self.mpu.mpu_disable_all_subregions();
        set_active_process_id(pcb.process_id());

        pcb.saved_sp = switch_to_user_thread(pcb.saved_sp) as usize;

        fault::take_context_switch_reason()
    }
}

/// Restores the callee-saved registers from the frame at `stack_pointer`,
/// sets PSP, and executes `svc` to drop into thread mode. Returns once the
/// process yields (`SVCall`) or is preempted (`PendSV`), with its current
/// process-mode stack pointer as the return value, read out of PSP after
/// the exception return that brought control back here.
#[naked]
unsafe extern "C" fn switch_to_user_thread(stack_pointer: usize) -> usize {
    core::arch::asm!(
        "
        msr psp, r0
        ldm r0!, {{r4-r7}}
        mov r8, r4
        mov r9, r5
        mov r10, r6
        mov r11, r7
        ldm r0!, {{r4-r7}}
        svc #0xFF
        mrs r0, psp
        bx lr
        ",
        options(noreturn)
    )
}
