//! Naked exception entry points. Grounded on the reference kernel's
//! `vm_fault_handler` inline asm (fetch the faulting address out of
//! `MMFAR`, call into the hardware-independent fault classifier, then
//! either resume or fall through to a panic) and on the Hubris ARMv7-M
//! `arch/arm_m.rs`'s `SVCall`/`PendSV`/`MemoryManagement` naked-asm
//! sequences (stash volatile state through a known pointer, branch into a
//! `#[no_mangle]` Rust body, restore and return).
//!
//! Every handler here does the minimum possible in assembly — move the
//! exception-entry state into registers a C/Rust ABI call can see — and
//! hands off immediately. `kernel::vm::fault::vm_fault` itself never
//! appears in this file: a board crate builds the concrete `VmTables` (its
//! flash backend is chip-specific) and installs a `VmFaultHandler` at boot,
//! the same way Hubris's `with_task_table` manufactures kernel state from a
//! pointer recorded once at startup rather than threading it through every
//! signature.

use core::sync::atomic::{AtomicU8, Ordering};
use kernel::error::KernelError;
use kernel::syscall::{ContextSwitchReason, Syscall};
use kernel::vm::{AccessKind, FaultOutcome};

/// Chip/board-independent seam a board installs once at boot, bundling
/// whatever concrete `VmTables<'_, SomeFlashBackend>` it assembled.
pub trait VmFaultHandler: Sync {
    fn handle_fault(&self, pid: u8, addr: usize, kind: AccessKind) -> Result<FaultOutcome, KernelError>;
}

/// Set exactly once during board init, before interrupts are enabled, and
/// read only from exception context afterward — the same single-writer,
/// single-reader discipline every other kernel singleton in this tree
/// relies on instead of a lock.
static mut VM_FAULT_HANDLER: Option<&'static dyn VmFaultHandler> = None;

/// # Safety
/// Must be called exactly once, before `MemoryManagement` can fire.
pub unsafe fn install_vm_fault_handler(handler: &'static dyn VmFaultHandler) {
    VM_FAULT_HANDLER = Some(handler);
}

/// Tracks which process is about to run, so `mem_manage_fault` knows whose
/// page table to charge an eviction/read-in against without threading it
/// through the asm trampoline. Set by `context_switch` immediately before
/// the exception return that hands control to the process.
static ACTIVE_PROCESS_ID: AtomicU8 = AtomicU8::new(kernel::config::INVALID_PROCESS_ID);

pub fn set_active_process_id(pid: u8) {
    ACTIVE_PROCESS_ID.store(pid, Ordering::Relaxed);
}

/// Records why control last returned to the kernel — a syscall, or a
/// preemption tick — since `switch_to_process` has no other way to learn
/// it once the naked trampoline returns.
static mut LAST_CONTEXT_SWITCH_REASON: ContextSwitchReason = ContextSwitchReason::Faulted;

pub(crate) unsafe fn take_context_switch_reason() -> ContextSwitchReason {
    LAST_CONTEXT_SWITCH_REASON
}

const SCB_CFSR: *const u32 = 0xE000_ED28 as *const u32;
const SCB_MMFAR: *const u32 = 0xE000_ED34 as *const u32;
const MMARVALID: u32 = 1 << 7;
const DACCVIOL: u32 = 1 << 1;

/// Entry point for a memory management fault, linked into the vector table
/// under this exact name per the `cortex-m-rt` exception-naming
/// convention. Does the minimum non-Rust-representable work (reading `lr`
/// to learn whether we faulted from thread or handler mode) and branches
/// straight into `mem_manage_fault`.
#[allow(non_snake_case)]
#[no_mangle]
#[naked]
pub unsafe extern "C" fn MemoryManagement() {
    core::arch::asm!(
        "mov r0, lr",
        "b {handler}",
        handler = sym mem_manage_fault,
        options(noreturn)
    )
}

/// The Rust-side memory management fault handler: reads `MMFAR`/`CFSR`,
/// classifies the access through the installed `VmFaultHandler`, and either
/// lets the naked trampoline return into the faulting instruction (the VM
/// handled it) or panics (everything else is a real program error, which
/// this kernel does not attempt to recover from — see the error-handling
/// policy `kernel::vm` follows throughout).
#[no_mangle]
unsafe extern "C" fn mem_manage_fault(exc_return: u32) {
    let cfsr = core::ptr::read_volatile(SCB_CFSR);
    let mmfar = core::ptr::read_volatile(SCB_MMFAR);
    let from_thread_mode = exc_return & 0b1000 != 0;

    if !from_thread_mode {
        panic!("memory management fault in kernel mode, CFSR=0x{:08x} MMFAR=0x{:08x}", cfsr, mmfar);
    }

    if cfsr & MMARVALID == 0 {
        panic!("memory management fault with no recorded address, CFSR=0x{:08x}", cfsr);
    }

    let handler = VM_FAULT_HANDLER.expect("VM fault handler not installed before first fault");
    let active_pid = ACTIVE_PROCESS_ID.load(Ordering::Relaxed);
    let access_kind = if cfsr & DACCVIOL != 0 { AccessKind::Write } else { AccessKind::Read };

    match handler.handle_fault(active_pid, mmfar as usize, access_kind) {
        Ok(FaultOutcome::Resumed) => resume_faulting_instruction(),
        Ok(FaultOutcome::NotHandled) => panic!("unhandled fault at 0x{:08x}", mmfar),
        Err(e) => panic!("VM fault handling failed: {:?}", e),
    }
}

/// Returns from the fault handler back into the instruction that faulted:
/// a plain Rust return from `mem_manage_fault` already does this. Kept as a
/// named no-op because the reference kernel's equivalent step reads as a
/// distinct decision point from the classification logic above it, and this
/// tree keeps that same visual separation.
#[inline(always)]
fn resume_faulting_instruction() {}

/// Entry point for the `SVC` instruction: the only syscall this kernel
/// exposes is `YIELD` (see `kernel::syscall::Syscall`).
#[allow(non_snake_case)]
#[no_mangle]
#[naked]
pub unsafe extern "C" fn SVCall() {
    core::arch::asm!(
        "b {handler}",
        handler = sym svcall_entry,
        options(noreturn)
    )
}

#[no_mangle]
unsafe extern "C" fn svcall_entry() {
    LAST_CONTEXT_SWITCH_REASON = ContextSwitchReason::SyscallFired { syscall: Syscall::YIELD };
}

/// Entry point for the periodic tick that drives preemptive round-robin
/// scheduling (§4.7): pends a `PendSV` so the actual context switch happens
/// at the lowest exception priority, after any higher-priority interrupt
/// that fired alongside it has finished.
#[allow(non_snake_case)]
#[no_mangle]
pub unsafe extern "C" fn SysTick() {
    cortex_m::peripheral::SCB::set_pendsv();
}

/// The deferred half of a tick-driven context switch. Disabling subregion
/// access for the outgoing process and re-enabling it lazily for the next
/// one (via first-touch faults) is `context_switch`'s job, run once control
/// returns to `switch_to_process` rather than here.
#[allow(non_snake_case)]
#[no_mangle]
#[naked]
pub unsafe extern "C" fn PendSV() {
    core::arch::asm!(
        "b {handler}",
        handler = sym pendsv_entry,
        options(noreturn)
    )
}

#[no_mangle]
unsafe extern "C" fn pendsv_entry() {
    LAST_CONTEXT_SWITCH_REASON = ContextSwitchReason::Faulted;
}
