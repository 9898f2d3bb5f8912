//! Address decomposition (§3): every VM address splits into a 6-bit group,
//! a 4-bit index, and an 8-bit page offset. `group` doubles as both the
//! page table's top-level index and the MPU subregion number, which is the
//! load-bearing identity the whole fault path depends on.

use crate::config;
use crate::error::KernelError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmAddr {
    pub group: u8,
    pub index: u8,
    pub offset: u16,
}

impl VmAddr {
    /// Decomposes a raw address. Fails with `OutOfRangeFault` if `raw` does
    /// not lie in the VM-managed SRAM window.
    pub fn new(raw: usize) -> Result<VmAddr, KernelError> {
        if raw < config::VM_BASE || raw >= config::VM_END {
            return Err(KernelError::OutOfRangeFault);
        }
        let rel = raw - config::VM_BASE;
        Ok(VmAddr {
            group: ((rel >> (config::INDEX_BITS + config::PAGE_OFFSET_BITS))
                & (config::SUBREGION_COUNT - 1)) as u8,
            index: ((rel >> config::PAGE_OFFSET_BITS) & (config::PAGES_PER_SUBREGION - 1)) as u8,
            offset: (rel & (config::PAGE_SIZE - 1)) as u16,
        })
    }

    /// The (group, index) pair concatenated into a single 10-bit SRAM page
    /// number, as used by `SRAM` PTEs and the SRAM owner table.
    pub fn sram_page_number(&self) -> u16 {
        ((self.group as u16) << config::INDEX_BITS) | self.index as u16
    }

    /// Raw address of the first byte of this address's subregion.
    pub fn subregion_base(&self) -> usize {
        config::VM_BASE + (self.group as usize) * config::SUBREGION_SIZE
    }

    pub fn region(&self) -> u8 {
        self.group / config::SUBREGIONS_PER_REGION as u8
    }

    pub fn subregion_in_region(&self) -> u8 {
        self.group % config::SUBREGIONS_PER_REGION as u8
    }

    /// Builds a `VmAddr` directly from its (group, index) coordinates, with
    /// a zero page offset. Used by code that already holds a page number
    /// (e.g. an owner-table lookup) rather than a raw fault address.
    pub fn from_group_index(group: u8, index: u8) -> VmAddr {
        VmAddr { group, index, offset: 0 }
    }
}

/// Inverse of [`VmAddr::sram_page_number`]: recovers `(group, index)` from a
/// page number as stored in an `SRAM` PTE or the owner table.
pub fn page_number_to_group_index(page_number: u16) -> (u8, u8) {
    (
        (page_number >> config::INDEX_BITS) as u8,
        (page_number & (config::PAGES_PER_SUBREGION as u16 - 1)) as u8,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decomposes_first_touch_address() {
        // 0x20001000 is VM_BASE + 0x1000: subregion (group) 1, page 0 within
        // it, zero offset — the concrete first-touch scenario's address,
        // whose subregion covers SRAM page numbers 16..31.
        let addr = VmAddr::new(0x2000_1000).unwrap();
        assert_eq!(addr.group, 1);
        assert_eq!(addr.index, 0);
        assert_eq!(addr.offset, 0);
        assert_eq!(addr.sram_page_number(), 16);
    }

    #[test]
    fn rejects_out_of_range() {
        assert_eq!(VmAddr::new(0x1000_0000), Err(KernelError::OutOfRangeFault));
        assert_eq!(VmAddr::new(config::VM_END), Err(KernelError::OutOfRangeFault));
    }

    #[test]
    fn page_number_round_trip() {
        let addr = VmAddr::new(0x2000_1234).unwrap();
        let pn = addr.sram_page_number();
        let (g, i) = page_number_to_group_index(pn);
        assert_eq!(g, addr.group);
        assert_eq!(i, addr.index);
    }
}
