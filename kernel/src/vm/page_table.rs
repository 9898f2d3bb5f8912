//! C3: the two-level page table. A process's top level is 64 bytes (one
//! per 4 KB subregion / group), each either the `INVALID` sentinel or an
//! index into the shared `PTE_GROUP` zone; a PTE group is the 16 PTEs
//! covering one subregion.
//!
//! Zone elements are wrapped in newtypes with a hand-written `Default`
//! rather than relying on the standard library's blanket array impl, which
//! historically only covered small fixed lengths.

use crate::config;
use crate::vm::addr::VmAddr;
use crate::vm::pte::Pte;

#[derive(Clone, Copy)]
pub struct PteGroupTable(pub [u8; config::SUBREGION_COUNT]);

impl Default for PteGroupTable {
    fn default() -> PteGroupTable {
        PteGroupTable([config::INVALID_GROUP_INDEX; config::SUBREGION_COUNT])
    }
}

impl PteGroupTable {
    pub fn reset_invalid(&mut self) {
        *self = PteGroupTable::default();
    }
}

#[derive(Clone, Copy)]
pub struct PteGroup(pub [Pte; config::PAGES_PER_SUBREGION]);

impl Default for PteGroup {
    fn default() -> PteGroup {
        PteGroup([Pte::invalid(); config::PAGES_PER_SUBREGION])
    }
}

impl PteGroup {
    pub fn reset_invalid(&mut self) {
        *self = PteGroup::default();
    }
}

pub type PteGroupZone = crate::zone::Zone<PteGroup, { config::PTE_GROUP_ZONE_SIZE }>;
pub type PteGroupTableZone = crate::zone::Zone<PteGroupTable, { config::PTE_GROUP_TABLE_ZONE_SIZE }>;

/// Returns a mutable reference to the PTE for `addr` in `root`'s table, or
/// `None` if the enclosing group has never been touched.
pub fn address_to_pte<'z>(
    group_zone: &'z PteGroupZone,
    root: &PteGroupTable,
    addr: VmAddr,
) -> Option<&'z mut Pte> {
    let group_idx = root.0[addr.group as usize];
    if group_idx == config::INVALID_GROUP_INDEX {
        return None;
    }
    let group = group_zone.get_mut(group_idx);
    Some(&mut group.0[addr.index as usize])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ZoneId;

    #[test]
    fn address_to_pte_missing_group_is_none() {
        let zone: PteGroupZone = crate::zone::Zone::new(ZoneId::PteGroup, [PteGroup::default(); config::PTE_GROUP_ZONE_SIZE]);
        zone.zinit();
        let root = PteGroupTable::default();
        let addr = VmAddr::new(0x2000_0000).unwrap();
        assert!(address_to_pte(&zone, &root, addr).is_none());
    }
}
