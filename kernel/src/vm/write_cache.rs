//! C4: the write cache. A bounded, byte-indexed array of page-sized slots
//! that buffers dirty pages evicted from SRAM en route to flash, reducing
//! flash wear. Grounded on the reference kernel's `write_cache`/
//! `write_cache_bitmap`/`vm_find_cache_victim`/`vm_procure_cache_entry`.

use crate::config;
use crate::error::KernelError;
use crate::vm::addr::VmAddr;
use crate::vm::bitmap::{self, Bitmap};
use crate::vm::flash_swap::{FlashBackend, FlashSwap};
use crate::vm::owner_tables::CacheOwnerTable;
use crate::vm::page_table::{self, PteGroupTableZone, PteGroupZone};
use crate::vm::pte::Pte;
use core::cell::{Cell, UnsafeCell};

pub const SLOT_COUNT: usize = config::WRITE_CACHE_SLOTS;
const BITMAP_BYTES: usize = SLOT_COUNT / 8;

pub struct WriteCache {
    pages: UnsafeCell<[u8; SLOT_COUNT * config::PAGE_SIZE]>,
    occupancy: Bitmap<BITMAP_BYTES>,
    occupancy_cursor: Cell<usize>,
    /// Persistent clock hand (§4.4), never reset to 0 between calls.
    hand: Cell<u16>,
}

unsafe impl Sync for WriteCache {}

impl WriteCache {
    pub const fn new() -> WriteCache {
        WriteCache {
            pages: UnsafeCell::new([0; SLOT_COUNT * config::PAGE_SIZE]),
            occupancy: Bitmap::new(),
            occupancy_cursor: Cell::new(0),
            hand: Cell::new(0),
        }
    }

    pub fn page(&self, slot: u16) -> &[u8] {
        let bytes = unsafe { &*self.pages.get() };
        let base = slot as usize * config::PAGE_SIZE;
        &bytes[base..base + config::PAGE_SIZE]
    }

    #[allow(clippy::mut_from_ref)]
    pub fn page_mut(&self, slot: u16) -> &mut [u8] {
        let bytes = unsafe { &mut *self.pages.get() };
        let base = slot as usize * config::PAGE_SIZE;
        &mut bytes[base..base + config::PAGE_SIZE]
    }

    fn try_claim_free_slot(&self) -> Option<u16> {
        let slot = bitmap::find_and_set_first_zero(&self.occupancy, SLOT_COUNT, self.occupancy_cursor.get())?;
        self.occupancy_cursor.set(slot + 1);
        Some(slot as u16)
    }

    fn advance_hand(&self) -> u16 {
        let slot = self.hand.get();
        self.hand.set((slot + 1) % SLOT_COUNT as u16);
        slot
    }

    /// §4.4 `procure_cache_entry`: a free slot if one exists, otherwise the
    /// clock hand's chosen victim, evicted to flash first.
    pub fn procure_entry<B: FlashBackend>(
        &self,
        owner_table: &CacheOwnerTable,
        group_zone: &PteGroupZone,
        roots: &PteGroupTableZone,
        flash: &FlashSwap,
        backend: &B,
    ) -> Result<u16, KernelError> {
        if let Some(slot) = self.try_claim_free_slot() {
            return Ok(slot);
        }

        let victim = self.find_victim(owner_table, group_zone, roots);
        self.evict_to_flash(victim, owner_table, group_zone, roots, flash, backend)?;
        Ok(victim)
    }

    /// The clock replacement algorithm (§4.4). Runs at least once; an
    /// unowned slot (should not normally occur) is claimed immediately.
    fn find_victim(&self, owner_table: &CacheOwnerTable, group_zone: &PteGroupZone, roots: &PteGroupTableZone) -> u16 {
        loop {
            let slot = self.advance_hand();
            let owner = owner_table.owner(slot);
            if !owner.is_owned() {
                return slot;
            }

            let root = roots.get(owner.pid);
            let addr = VmAddr::from_group_index(owner.group, owner.index);
            let pte = page_table::address_to_pte(group_zone, root, addr)
                .expect("cache owner table referenced an unallocated PTE group");

            if pte.cache_aging() == 0 {
                return slot;
            }
            pte.decrement_aging();
        }
    }

    fn evict_to_flash<B: FlashBackend>(
        &self,
        slot: u16,
        owner_table: &CacheOwnerTable,
        group_zone: &PteGroupZone,
        roots: &PteGroupTableZone,
        flash: &FlashSwap,
        backend: &B,
    ) -> Result<(), KernelError> {
        let owner = owner_table.owner(slot);
        let root = roots.get(owner.pid);
        let addr = VmAddr::from_group_index(owner.group, owner.index);
        let pte = page_table::address_to_pte(group_zone, root, addr)
            .expect("cache owner table referenced an unallocated PTE group");

        let flash_index = flash.procure_page(backend)?;
        backend.program_page(flash_index, self.page(slot))?;
        *pte = Pte::new_flash(flash_index.index(), false);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ZoneId;
    use crate::vm::owner_tables::CacheOwnerEntry;
    use crate::vm::page_table::{PteGroup, PteGroupTable};
    use crate::zone::Zone;
    use std::vec::Vec;

    struct NullFlash;
    impl FlashBackend for NullFlash {
        fn page(&self, _index: crate::vm::flash_swap::FlashIndex) -> &[u8] {
            &[]
        }
        fn program_page(&self, _index: crate::vm::flash_swap::FlashIndex, _data: &[u8]) -> Result<(), KernelError> {
            Ok(())
        }
        fn erase_sector(&self, _sector: u16) -> Result<(), KernelError> {
            Ok(())
        }
        #[cfg(feature = "flash_wear_check")]
        fn verify_erased(&self, _sector: u16) -> bool {
            true
        }
    }

    #[test]
    fn claims_free_slots_before_running_the_clock() {
        let cache = WriteCache::new();
        let owner_table = CacheOwnerTable::new();
        let group_zone: PteGroupZone = Zone::new(ZoneId::PteGroup, [PteGroup::default(); 4]);
        let root_zone: PteGroupTableZone = Zone::new(ZoneId::PteGroupTable, [PteGroupTable::default(); 4]);
        group_zone.zinit();
        root_zone.zinit();

        let slot = cache
            .procure_entry(&owner_table, &group_zone, &root_zone, &FlashSwap::new(), &NullFlash)
            .unwrap();
        assert_eq!(slot, 0);
    }

    #[test]
    fn evicts_the_least_recently_dirtied_slot_when_full() {
        let cache = WriteCache::new();
        let owner_table = CacheOwnerTable::new();
        let group_zone: PteGroupZone = Zone::new(ZoneId::PteGroup, [PteGroup::default(); 8]);
        let root_zone: PteGroupTableZone = Zone::new(ZoneId::PteGroupTable, [PteGroupTable::default(); 8]);
        group_zone.zinit();
        root_zone.zinit();
        let flash = FlashSwap::new();
        let backend = NullFlash;

        // Fill every slot, each owned by a distinct one-page process.
        let mut roots = Vec::new();
        for slot in 0..SLOT_COUNT {
            let pid = root_zone.zalloc().unwrap();
            let root = root_zone.get_mut(pid);
            let group_idx = group_zone.zalloc().unwrap();
            root.0[0] = group_idx;
            let group = group_zone.get_mut(group_idx);
            group.0[0] = Pte::new_cache(slot as u16, crate::vm::pte::INITIAL_CACHE_AGING);
            owner_table.set_owner(slot as u16, CacheOwnerEntry { pid, group: 0, index: 0 });
            cache.page_mut(slot as u16).copy_from_slice(&[slot as u8; config::PAGE_SIZE]);
            roots.push(pid);
        }

        // Age every entry down to 0 except slot 3, which should survive.
        for (slot, &pid) in roots.iter().enumerate() {
            if slot == 3 {
                continue;
            }
            let root = root_zone.get_mut(pid);
            let group = group_zone.get_mut(root.0[0]);
            group.0[0].decrement_aging();
            group.0[0].decrement_aging();
        }

        let victim = cache.procure_entry(&owner_table, &group_zone, &root_zone, &flash, &backend).unwrap();
        assert_ne!(victim, 3, "the only still-warm entry must not be evicted");
    }
}
