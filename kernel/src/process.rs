//! C7 (the process half) and C8: the process control block, its lifecycle
//! states, and the boot-time constructor that turns a flash-resident binary
//! image into a schedulable process.
//!
//! Grounded on the reference kernel's `pcb_t` (saved stack pointer,
//! page-table root, ready-queue links, heap-region list) and on this tree's
//! own scheduler nodes (`kernel::sched::round_robin::RoundRobinProcessNode`),
//! which thread ready-queue membership through the same kind of intrusive
//! link this module uses for the PCB itself.

use crate::common::list::{List, ListLink, ListNode};
use crate::config;
use crate::error::KernelError;
use crate::vm::addr::VmAddr;
use crate::vm::page_table::{PteGroup, PteGroupTable};
use crate::vm::pte::Pte;
use crate::zone::Zone;
use core::cell::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Allocated but never yet switched to.
    Unstarted,
    /// Expects to run the next time the scheduler picks it.
    Running,
    /// Returned via voluntary yield; picked up again on its next turn (this
    /// system has no callback queue to wait on, unlike the Tock scheduler
    /// this one is adapted from).
    Yielded,
}

/// One entry in a process's heap-region list. Zone-allocated would be
/// overkill for the bump-pointer region tracking this spec covers; heap
/// regions are carried as a simple fixed-capacity array instead of an
/// intrusive list, since user `malloc` itself is explicitly out of scope
/// and all that's needed here is bookkeeping of the region a process has
/// been granted.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeapRegion {
    pub base: usize,
    pub len: usize,
}

pub const MAX_HEAP_REGIONS: usize = 4;

/// Process control block. `index` into the PCB zone is this process's
/// identity (§3: "Process identifier"), and by invariant 7 is also the
/// index of `page_table_root` in the page-table-root zone.
pub struct Pcb {
    pub saved_sp: usize,
    pub page_table_root: u8,
    pub state: Cell<State>,
    pub heap_regions: [HeapRegion; MAX_HEAP_REGIONS],
    pub heap_region_count: usize,
    ready_link: ListLink<'static, Pcb>,
}

impl Default for Pcb {
    fn default() -> Pcb {
        Pcb {
            saved_sp: 0,
            page_table_root: config::INVALID_GROUP_INDEX,
            state: Cell::new(State::Unstarted),
            heap_regions: [HeapRegion::default(); MAX_HEAP_REGIONS],
            heap_region_count: 0,
            ready_link: ListLink::empty(),
        }
    }
}

impl Clone for Pcb {
    fn clone(&self) -> Pcb {
        Pcb {
            saved_sp: self.saved_sp,
            page_table_root: self.page_table_root,
            state: Cell::new(self.state.get()),
            heap_regions: self.heap_regions,
            heap_region_count: self.heap_region_count,
            ready_link: ListLink::empty(),
        }
    }
}

impl ListNode<'static, Pcb> for Pcb {
    fn next(&'static self) -> &'static ListLink<'static, Pcb> {
        &self.ready_link
    }
}

pub trait ProcessType {
    fn process_id(&self) -> u8;
    fn get_state(&self) -> State;
    fn set_state(&self, state: State);
}

/// Invariant 7: `page_table_root` doubles as this process's identifier, so
/// no separate id field is needed on the struct itself.
impl ProcessType for Pcb {
    fn process_id(&self) -> u8 {
        self.page_table_root
    }

    fn get_state(&self) -> State {
        self.state.get()
    }

    fn set_state(&self, state: State) {
        self.state.set(state)
    }
}

/// Builds a process from a pre-staged flash image, per §4.8.
pub struct ImageDescriptor {
    /// Offset of the image's first byte within the generic-flash region.
    pub flash_page_base: u16,
    /// Size of the image in 256 B pages.
    pub page_count: u16,
    /// Entry point, as an offset from the start of the process's VM window
    /// (the thumb bit is set by `create_from_image`, not supplied here).
    pub entry_offset: usize,
}

pub struct ProcessZones<'a> {
    pub pcb: &'a Zone<Pcb, { config::PCB_ZONE_SIZE }>,
    pub pte_group_table: &'a Zone<PteGroupTable, { config::PTE_GROUP_TABLE_ZONE_SIZE }>,
    pub pte_group: &'a Zone<PteGroup, { config::PTE_GROUP_ZONE_SIZE }>,
}

/// Installs generic-flash PTEs for every page of `image`, targeted at
/// `sram_base` (a VM-window offset, not a flash offset), and returns the
/// freshly allocated process id. Does not touch the ready queue or
/// synthesize the initial register frame — callers combine this with
/// `sched::enqueue` and the architecture's frame-initialization routine,
/// which needs the process's stack pointer already fault-mapped (step 3 of
/// §4.8) before it can write into it.
pub fn create_from_image(
    zones: &ProcessZones<'_>,
    image: &ImageDescriptor,
    sram_base: usize,
) -> Result<u8, KernelError> {
    let pid = zones.pcb.zalloc()?;
    let table_idx = zones.pte_group_table.zalloc()?;
    // Invariant 7: page-table-root index must equal process id.
    debug_assert_eq!(pid, table_idx, "PCB and page-table-root zones fell out of lockstep");

    {
        let table = zones.pte_group_table.get_mut(pid);
        table.reset_invalid();
    }

    for page in 0..image.page_count {
        let page_addr = sram_base + (page as usize) * config::PAGE_SIZE;
        let addr = VmAddr::new(page_addr)?;
        let group = addr.group as usize;
        let index_in_group = addr.index as usize;

        let table = zones.pte_group_table.get_mut(pid);
        if table.0[group] == config::INVALID_GROUP_INDEX {
            let new_group_idx = zones.pte_group.zalloc()?;
            {
                let group_slots = zones.pte_group.get_mut(new_group_idx);
                group_slots.reset_invalid();
            }
            table.0[group] = new_group_idx;
        }
        let group_idx = table.0[group];
        let group_slots = zones.pte_group.get_mut(group_idx);
        let flash_index = image.flash_page_base as usize + page as usize;
        group_slots.0[index_in_group] = Pte::new_flash(flash_index as u16, /* generic = */ true);
    }

    {
        let pcb = zones.pcb.get_mut(pid);
        pcb.page_table_root = pid;
        pcb.state.set(State::Unstarted);
    }

    Ok(pid)
}

pub fn ready_queue_push(queue: &List<'static, Pcb>, pcb: &'static Pcb) {
    queue.push_tail(pcb);
}
