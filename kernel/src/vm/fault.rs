//! C6: the fault handler core. Hardware-independent half of
//! `vm_fault_handler`/`vm_evict_sram_page`/`vm_read_in_subregion`/
//! `vm_get_page_contents`; the naked-asm entry point and resume trampoline
//! live in the architecture crate, which calls [`vm_fault`] and then
//! decides whether to resume or fall through to an unhandled-fault path.
//!
//! **Concurrency.** Runs to completion in exception context with
//! preemption disabled (§5 of the design): every table this module touches
//! is a plain `&self`-mutable singleton, safe only because nothing here is
//! ever reentered.

use crate::config;
use crate::error::KernelError;
use crate::vm::addr::{self, VmAddr};
use crate::vm::flash_swap::{FlashBackend, FlashIndex, FlashSwap};
use crate::vm::owner_tables::{CacheOwnerEntry, CacheOwnerTable, SramOwnerTable};
use crate::vm::page_table::{self, PteGroupTableZone, PteGroupZone};
use crate::vm::pte::{Pte, PteType};
use crate::vm::sram::PhysicalSram;
use crate::vm::write_cache::WriteCache;

/// The classifier's guarantee about why the fault occurred (§6). Not
/// consulted by the eviction/read-in algorithm itself — this system has no
/// dirty-bit hardware (Non-goal) and treats every subregion touch the same
/// regardless of direction — but carried through the entry point so the
/// signature matches the classifier contract exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Read,
    Write,
}

/// What the classifier should do once `vm_fault` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultOutcome {
    /// The subregion is mapped and enabled; the classifier may resume the
    /// faulting instruction.
    Resumed,
    /// `addr` does not lie in the VM-managed window; not a VM fault.
    NotHandled,
}

/// Every table the fault path touches, bundled so `vm_fault` takes one
/// reference instead of eight. `B` is the chip's blocking flash seam (see
/// `flash_swap` module docs for why it is synchronous).
pub struct VmTables<'a, B: FlashBackend> {
    pub group_zone: &'a PteGroupZone,
    pub roots: &'a PteGroupTableZone,
    pub sram_owners: &'a SramOwnerTable,
    pub cache_owners: &'a CacheOwnerTable,
    pub sram: &'a PhysicalSram,
    pub write_cache: &'a WriteCache,
    pub flash: &'a FlashSwap,
    pub backend: &'a B,
}

/// §4.6 entry point. `active_pid` is the currently scheduled process
/// (`pcb_active` in the reference kernel); `mpu` is asked to enable the
/// resolved subregion once its contents are correct, but is never asked to
/// perform the exception return itself — that stays in the architecture
/// crate.
pub fn vm_fault<B: FlashBackend, M: crate::platform::mpu::Mpu>(
    tables: &VmTables<'_, B>,
    mpu: &M,
    active_pid: u8,
    faulting_address: usize,
    _access_kind: AccessKind,
) -> Result<FaultOutcome, KernelError> {
    let addr = match VmAddr::new(faulting_address) {
        Ok(addr) => addr,
        Err(KernelError::OutOfRangeFault) => return Ok(FaultOutcome::NotHandled),
        Err(e) => return Err(e),
    };

    let subregion_base_page = (addr.group as u16) * config::PAGES_PER_SUBREGION as u16;
    for offset in 0..config::PAGES_PER_SUBREGION as u16 {
        let page_number = subregion_base_page + offset;
        let owner = tables.sram_owners.owner(page_number);
        if owner != active_pid {
            evict_sram_page(tables, page_number, owner)?;
            tables.sram_owners.set_owner(page_number, active_pid);
        }
    }

    read_in_subregion(tables, active_pid, addr.group)?;
    mpu.mpu_enable_subregion(addr.subregion_base());

    Ok(FaultOutcome::Resumed)
}

/// §4.6 `evict_sram_page`. Guarantees `page_number` is unoccupied (safe to
/// overwrite) upon return.
fn evict_sram_page<B: FlashBackend>(
    tables: &VmTables<'_, B>,
    page_number: u16,
    owner: u8,
) -> Result<(), KernelError> {
    if owner == config::INVALID_PROCESS_ID {
        return Ok(());
    }

    let root = tables.roots.get(owner);
    let (group, index) = addr::page_number_to_group_index(page_number);
    let pte_addr = VmAddr::from_group_index(group, index);
    let pte = match page_table::address_to_pte(tables.group_zone, root, pte_addr) {
        Some(pte) if pte.ty() != PteType::Invalid => pte,
        _ => return Ok(()),
    };

    if pte.ty() != PteType::Sram {
        let backing = page_contents(pte, tables.sram, tables.write_cache, tables.backend);
        if backing == tables.sram.page(page_number) {
            return Ok(());
        }
    }

    match pte.ty() {
        PteType::Cache => {
            let slot = pte.cache_slot();
            tables.write_cache.page_mut(slot).copy_from_slice(tables.sram.page(page_number));
            pte.increment_aging();
        }
        _ => {
            let entry = tables.write_cache.procure_entry(
                tables.cache_owners,
                tables.group_zone,
                tables.roots,
                tables.flash,
                tables.backend,
            )?;
            tables.cache_owners.set_owner(entry, CacheOwnerEntry { pid: owner, group, index });
            tables.write_cache.page_mut(entry).copy_from_slice(tables.sram.page(page_number));
            *pte = Pte::new_cache(entry, crate::vm::pte::INITIAL_CACHE_AGING);
        }
    }

    Ok(())
}

/// §4.6 `read_in_subregion`. First-touch allocates the PTE group as
/// self-referential `SRAM` entries and zeroes the subregion; otherwise
/// copies each PTE's backing content into place.
fn read_in_subregion<B: FlashBackend>(
    tables: &VmTables<'_, B>,
    active_pid: u8,
    group: u8,
) -> Result<(), KernelError> {
    let root = tables.roots.get_mut(active_pid);
    let base_page = (group as u16) * config::PAGES_PER_SUBREGION as u16;

    if root.0[group as usize] == config::INVALID_GROUP_INDEX {
        let group_idx = tables.group_zone.zalloc()?;
        let slots = tables.group_zone.get_mut(group_idx);
        for i in 0..config::PAGES_PER_SUBREGION as u16 {
            slots.0[i as usize] = Pte::new_sram(base_page + i);
        }
        root.0[group as usize] = group_idx;
        tables.sram.zero_subregion(base_page);
        return Ok(());
    }

    let group_idx = root.0[group as usize];
    let slots = tables.group_zone.get_mut(group_idx);
    for i in 0..config::PAGES_PER_SUBREGION as u16 {
        let pte = &slots.0[i as usize];
        let mut buf = [0u8; config::PAGE_SIZE];
        buf.copy_from_slice(page_contents(pte, tables.sram, tables.write_cache, tables.backend));
        tables.sram.page_mut(base_page + i).copy_from_slice(&buf);
    }

    Ok(())
}

/// §4.6 `vm_get_page_contents`. Read-only view of what a PTE currently
/// points at, regardless of which backing store holds it.
fn page_contents<'a, B: FlashBackend>(
    pte: &Pte,
    sram: &'a PhysicalSram,
    write_cache: &'a WriteCache,
    backend: &'a B,
) -> &'a [u8] {
    match pte.ty() {
        PteType::Invalid => panic!("page_contents called on an invalid PTE"),
        PteType::Sram => sram.page(pte.sram_page()),
        PteType::Cache => write_cache.page(pte.cache_slot()),
        PteType::Flash => backend.page(FlashIndex::from_pte(pte)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ZoneId;
    use crate::vm::page_table::{PteGroup, PteGroupTable};
    use crate::zone::Zone;

    struct NullFlash;
    impl FlashBackend for NullFlash {
        fn page(&self, _index: FlashIndex) -> &[u8] {
            &[]
        }
        fn program_page(&self, _index: FlashIndex, _data: &[u8]) -> Result<(), KernelError> {
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

    struct NullMpu {
        enabled: core::cell::Cell<Option<usize>>,
    }
    impl crate::platform::mpu::Mpu for NullMpu {
        fn mpu_init(&self) {}
        fn mpu_enable_subregion(&self, addr: usize) {
            self.enabled.set(Some(addr));
        }
        fn mpu_disable_all_subregions(&self) {}
        fn mpu_instruction_executable(&self, _addr: usize) -> bool {
            true
        }
        fn enable_mpu(&self) {}
        fn disable_mpu(&self) {}
    }

    fn new_tables() -> (
        PteGroupZone,
        PteGroupTableZone,
        SramOwnerTable,
        CacheOwnerTable,
        PhysicalSram,
        WriteCache,
        FlashSwap,
        NullFlash,
    ) {
        let group_zone: PteGroupZone = Zone::new(ZoneId::PteGroup, [PteGroup::default(); config::PTE_GROUP_ZONE_SIZE]);
        let roots: PteGroupTableZone =
            Zone::new(ZoneId::PteGroupTable, [PteGroupTable::default(); config::PTE_GROUP_TABLE_ZONE_SIZE]);
        group_zone.zinit();
        roots.zinit();
        (
            group_zone,
            roots,
            SramOwnerTable::new(),
            CacheOwnerTable::new(),
            PhysicalSram::new(),
            WriteCache::new(),
            FlashSwap::new(),
            NullFlash,
        )
    }

    #[test]
    fn first_touch_maps_sram_and_zeroes_the_subregion() {
        let (group_zone, roots, sram_owners, cache_owners, sram, write_cache, flash, backend) = new_tables();
        let pid = roots.zalloc().unwrap();
        let tables = VmTables { group_zone: &group_zone, roots: &roots, sram_owners: &sram_owners, cache_owners: &cache_owners, sram: &sram, write_cache: &write_cache, flash: &flash, backend: &backend };
        let mpu = NullMpu { enabled: core::cell::Cell::new(None) };

        let outcome = vm_fault(&tables, &mpu, pid, 0x2000_1000, AccessKind::Write).unwrap();
        assert_eq!(outcome, FaultOutcome::Resumed);
        assert_eq!(mpu.enabled.get(), Some(0x2000_1000));
        assert!(sram.page(16).iter().all(|&b| b == 0));
        assert_eq!(sram_owners.owner(16), pid);
    }

    #[test]
    fn out_of_range_address_is_not_handled() {
        let (group_zone, roots, sram_owners, cache_owners, sram, write_cache, flash, backend) = new_tables();
        let pid = roots.zalloc().unwrap();
        let tables = VmTables { group_zone: &group_zone, roots: &roots, sram_owners: &sram_owners, cache_owners: &cache_owners, sram: &sram, write_cache: &write_cache, flash: &flash, backend: &backend };
        let mpu = NullMpu { enabled: core::cell::Cell::new(None) };

        let outcome = vm_fault(&tables, &mpu, pid, 0x1000_0000, AccessKind::Read).unwrap();
        assert_eq!(outcome, FaultOutcome::NotHandled);
        assert!(mpu.enabled.get().is_none());
    }

    #[test]
    fn switching_processes_evicts_the_previous_owner_to_the_cache() {
        let (group_zone, roots, sram_owners, cache_owners, sram, write_cache, flash, backend) = new_tables();
        let pid_a = roots.zalloc().unwrap();
        let pid_b = roots.zalloc().unwrap();
        let tables = VmTables { group_zone: &group_zone, roots: &roots, sram_owners: &sram_owners, cache_owners: &cache_owners, sram: &sram, write_cache: &write_cache, flash: &flash, backend: &backend };
        let mpu = NullMpu { enabled: core::cell::Cell::new(None) };

        vm_fault(&tables, &mpu, pid_a, 0x2000_1000, AccessKind::Write).unwrap();
        sram.page_mut(16).copy_from_slice(&[0x42; config::PAGE_SIZE]);

        vm_fault(&tables, &mpu, pid_b, 0x2000_1000, AccessKind::Write).unwrap();
        assert_eq!(sram_owners.owner(16), pid_b);

        let root_a = roots.get(pid_a);
        let pte = page_table::address_to_pte(&group_zone, root_a, VmAddr::from_group_index(1, 0)).unwrap();
        assert_eq!(pte.ty(), PteType::Cache);
        assert!(write_cache.page(pte.cache_slot()).iter().all(|&b| b == 0x42));
    }

    #[test]
    fn untouched_sram_page_evicts_to_an_unchanged_cache_entry() {
        let (group_zone, roots, sram_owners, cache_owners, sram, write_cache, flash, backend) = new_tables();
        let pid_a = roots.zalloc().unwrap();
        let pid_b = roots.zalloc().unwrap();
        let tables = VmTables { group_zone: &group_zone, roots: &roots, sram_owners: &sram_owners, cache_owners: &cache_owners, sram: &sram, write_cache: &write_cache, flash: &flash, backend: &backend };
        let mpu = NullMpu { enabled: core::cell::Cell::new(None) };

        vm_fault(&tables, &mpu, pid_a, 0x2000_1000, AccessKind::Read).unwrap();
        // Never written: still all-zero from first-touch. `evict_sram_page`
        // promotes every Sram-typed PTE to Cache unconditionally on its
        // first eviction (matches the original kernel's `pte->type >
        // PTE_SRAM` guard); the clean/dirty compare only applies to a PTE
        // that is already Cache- or Flash-typed.
        vm_fault(&tables, &mpu, pid_b, 0x2000_1000, AccessKind::Write).unwrap();

        let root_a = roots.get(pid_a);
        let pte = page_table::address_to_pte(&group_zone, root_a, VmAddr::from_group_index(1, 0)).unwrap();
        assert_eq!(pte.ty(), PteType::Cache, "first eviction always promotes Sram to Cache");
        assert!(
            write_cache.page(pte.cache_slot()).iter().all(|&b| b == 0),
            "never-written page should evict with its untouched all-zero content"
        );
    }
}
