//! Board wiring for a demo RP2040 target: assembles the concrete VM tables,
//! installs the fault handler, stages one process from a build-time flash
//! image, and drives the round-robin scheduler. Contains no kernel logic of
//! its own — every operation here is a call into `kernel`, `arch_cortex_m0`,
//! or `chips_rp2040`; the board only owns the wiring and the vector table.
//!
//! Locating process binaries in flash and calling `create_from_image` for
//! each is the third-stage bootloader's job, which this tree treats as an
//! external collaborator. What follows is a minimal illustrative stand-in
//! for that sequence: one statically known image descriptor, staged once at
//! boot.

#![no_std]
#![no_main]

use core::mem::MaybeUninit;
use core::panic::PanicInfo;

use arch_cortex_m0::context_switch::initial_stack_frame;
use arch_cortex_m0::fault::{install_vm_fault_handler, VmFaultHandler};
use arch_cortex_m0::Cortexm0Mpu;
use chips_rp2040::{Rp2040Chip, Rp2040FlashBackend};
use kernel::capabilities::MainLoopCap;
use kernel::config;
use kernel::error::{KernelError, ZoneId};
use kernel::platform::mpu::Mpu;
use kernel::platform::Chip;
use kernel::process::{self, ImageDescriptor, Pcb, ProcessType, ProcessZones};
use kernel::sched::{run_loop, RoundRobinSched};
use kernel::vm::flash_swap::FlashSwap;
use kernel::vm::owner_tables::{CacheOwnerTable, SramOwnerTable};
use kernel::vm::page_table::{PteGroup, PteGroupTable, PteGroupTableZone, PteGroupZone};
use kernel::vm::sram::PhysicalSram;
use kernel::vm::write_cache::WriteCache;
use kernel::vm::{vm_fault, AccessKind, FaultOutcome, VmTables};
use kernel::zone::Zone;

// Singletons with a literal-fillable `Default`/const constructor live as
// plain `static`s, the same way `kernel::vm::{sram, write_cache,
// owner_tables, flash_swap}` build their own test fixtures. The three
// zones keyed on `Pcb`/`PteGroup`/`PteGroupTable` build their free lists
// from `T::default()`, which is not `const fn`, so they are staged into
// `MaybeUninit` and written once during `main` before anything can race
// them — single-threaded, pre-interrupt boot, the same discipline
// `arch_cortex_m0::fault`'s globals rely on.
static SRAM_OWNERS: SramOwnerTable = SramOwnerTable::new();
static CACHE_OWNERS: CacheOwnerTable = CacheOwnerTable::new();
static SRAM: PhysicalSram = PhysicalSram::new();
static WRITE_CACHE: WriteCache = WriteCache::new();
static FLASH_SWAP: FlashSwap = FlashSwap::new();

// A single piece of MMIO hardware, not `Sync`-safe to share; `static mut`
// rather than wrapping it in a cell that requires `Sync`, touched only from
// boot and exception context.
static mut FLASH_BACKEND: Rp2040FlashBackend = Rp2040FlashBackend::new();

static mut PCB_ZONE: MaybeUninit<Zone<Pcb, { config::PCB_ZONE_SIZE }>> = MaybeUninit::uninit();
static mut GROUP_ZONE: MaybeUninit<PteGroupZone> = MaybeUninit::uninit();
static mut ROOT_ZONE: MaybeUninit<PteGroupTableZone> = MaybeUninit::uninit();

static CHIP: Rp2040Chip = unsafe { Rp2040Chip::new() };

struct BoardVmFaultHandler {
    tables: VmTables<'static, Rp2040FlashBackend>,
    mpu: &'static Cortexm0Mpu,
}

// Reached only from `MemoryManagement`, which this kernel never reenters
// (§5 concurrency model).
unsafe impl Sync for BoardVmFaultHandler {}

impl VmFaultHandler for BoardVmFaultHandler {
    fn handle_fault(&self, pid: u8, addr: usize, kind: AccessKind) -> Result<FaultOutcome, KernelError> {
        vm_fault(&self.tables, self.mpu, pid, addr, kind)
    }
}

static mut FAULT_HANDLER: MaybeUninit<BoardVmFaultHandler> = MaybeUninit::uninit();

/// A single demo process, staged at a fixed offset in the generic flash
/// region by whatever built this image; a real bootloader would discover
/// this descriptor from a flash-resident manifest instead of a constant.
const DEMO_IMAGE: ImageDescriptor = ImageDescriptor { flash_page_base: 0, page_count: 4, entry_offset: 0 };

#[no_mangle]
pub extern "C" fn main() -> ! {
    let pcb_zone: &'static Zone<Pcb, { config::PCB_ZONE_SIZE }> = unsafe {
        PCB_ZONE.write(Zone::new(ZoneId::Pcb, core::array::from_fn(|_| Pcb::default())));
        PCB_ZONE.assume_init_ref()
    };
    let group_zone: &'static PteGroupZone = unsafe {
        GROUP_ZONE.write(Zone::new(ZoneId::PteGroup, core::array::from_fn(|_| PteGroup::default())));
        GROUP_ZONE.assume_init_ref()
    };
    let root_zone: &'static PteGroupTableZone = unsafe {
        ROOT_ZONE.write(Zone::new(ZoneId::PteGroupTable, core::array::from_fn(|_| PteGroupTable::default())));
        ROOT_ZONE.assume_init_ref()
    };
    pcb_zone.zinit();
    group_zone.zinit();
    root_zone.zinit();

    let flash_backend: &'static Rp2040FlashBackend = unsafe { &FLASH_BACKEND };

    let zones = ProcessZones { pcb: pcb_zone, pte_group_table: root_zone, pte_group: group_zone };
    let pid = process::create_from_image(&zones, &DEMO_IMAGE, config::VM_BASE)
        .expect("demo image did not fit the process zones");

    let handler: &'static BoardVmFaultHandler = unsafe {
        FAULT_HANDLER.write(BoardVmFaultHandler {
            tables: VmTables {
                group_zone,
                roots: root_zone,
                sram_owners: &SRAM_OWNERS,
                cache_owners: &CACHE_OWNERS,
                sram: &SRAM,
                write_cache: &WRITE_CACHE,
                flash: &FLASH_SWAP,
                backend: flash_backend,
            },
            mpu: CHIP.mpu(),
        });
        unsafe { install_vm_fault_handler(FAULT_HANDLER.assume_init_ref()) };
        FAULT_HANDLER.assume_init_ref()
    };

    CHIP.mpu().mpu_init();
    CHIP.mpu().enable_mpu();

    // §4.8 steps 3-4: fault in the page covering the initial stack pointer
    // before writing into it, then synthesize the frame `switch_to_user_thread`
    // expects to find there.
    let initial_sp = config::VM_END;
    vm_fault(&handler.tables, handler.mpu, pid, initial_sp - 1, AccessKind::Write)
        .expect("failed to fault in the initial stack page");
    let entry_point = config::VM_BASE + DEMO_IMAGE.entry_offset;
    let frame_base = unsafe { initial_stack_frame(initial_sp, entry_point) };
    pcb_zone.get_mut(pid).saved_sp = frame_base;

    let sched = RoundRobinSched::new();
    let pcb: &'static Pcb = pcb_zone.get(pid);
    pcb.set_state(kernel::process::State::Running);
    sched.enqueue(pcb);

    run_loop(&sched, &CHIP, &MainLoopCap)
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    kernel::debug!("panic: {}", info);
    loop {
        cortex_m::asm::wfi();
    }
}

/// Reset handler: zeroes `.bss`, copies `.data` out of flash, then calls
/// `main`. The vector table itself (initial SP plus the 16 Cortex-M0
/// exception slots) is supplied by the linker script/startup assembly this
/// source tree does not carry; it is expected to place `Reset` at vector 1
/// and `arch_cortex_m0::fault::{MemoryManagement, SVCall, PendSV, SysTick}`
/// at vectors 4, 11, 14, 15 by their `#[no_mangle]` names, the same
/// convention `cortex-m-rt`-based boards rely on.
#[no_mangle]
pub unsafe extern "C" fn Reset() -> ! {
    extern "C" {
        static mut _sbss: u32;
        static mut _ebss: u32;
        static mut _sdata: u32;
        static mut _edata: u32;
        static _sidata: u32;
    }

    let mut bss = &mut _sbss as *mut u32;
    while bss < &mut _ebss as *mut u32 {
        core::ptr::write_volatile(bss, 0);
        bss = bss.offset(1);
    }

    let mut data = &mut _sdata as *mut u32;
    let mut data_src = &_sidata as *const u32;
    while data < &mut _edata as *mut u32 {
        core::ptr::write_volatile(data, core::ptr::read(data_src));
        data = data.offset(1);
        data_src = data_src.offset(1);
    }

    main()
}
