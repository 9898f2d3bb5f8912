//! The tagged-variant page table entry (§3, §9). 16 bits, discriminator in
//! the low 2 bits, remaining 14 bits interpreted per variant. Implemented
//! as a `LocalRegisterCopy` over a software-only bitfield register, the
//! same mechanism this tree's chip drivers use to decode hardware
//! registers (`register_bitfields!` + `.read()`/`.write()`/`.is_set()`),
//! applied here to a value with no MMIO behind it at all.
//!
//! Field layout (bit 0 is the LSB):
//!
//! ```text
//!  15            10  9                2 1 0
//! +------------------+-----------------+---+
//! | FlashIndex[12:5] | FlashIndex[4:0].| Ty|   FLASH  (bit 15 = generic flag)
//! +------------------+-----------------+---+
//! ```
//!
//! The three variants overlap the same 14 data bits; only `ty()` says which
//! interpretation is live, exactly the "discriminated union, first two bits
//! lead" design called for in the data model.

use crate::common::registers::{register_bitfields, LocalRegisterCopy};

register_bitfields![u16,
    PteFields [
        TYPE OFFSET(0) NUMBITS(2) [
            Invalid = 0,
            Sram = 1,
            Cache = 2,
            Flash = 3
        ],
        SRAM_PAGE OFFSET(2) NUMBITS(10) [],
        CACHE_SLOT OFFSET(2) NUMBITS(8) [],
        CACHE_AGING OFFSET(10) NUMBITS(3) [],
        FLASH_INDEX OFFSET(2) NUMBITS(13) [],
        FLASH_GENERIC OFFSET(15) NUMBITS(1) []
    ]
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PteType {
    Invalid,
    Sram,
    Cache,
    Flash,
}

/// Starting aging value for a freshly cached entry (§4.4): new entries
/// survive at least one pass of the clock hand.
pub const INITIAL_CACHE_AGING: u16 = 2;
pub const MAX_CACHE_AGING: u16 = 0b111;

#[derive(Clone, Copy)]
pub struct Pte(LocalRegisterCopy<u16, PteFields::Register>);

impl Pte {
    pub fn invalid() -> Pte {
        Pte(LocalRegisterCopy::new(0))
    }

    pub fn new_sram(page_number: u16) -> Pte {
        let mut reg = LocalRegisterCopy::new(0);
        reg.write(PteFields::TYPE::Sram + PteFields::SRAM_PAGE.val(page_number));
        Pte(reg)
    }

    pub fn new_cache(slot: u16, aging: u16) -> Pte {
        let mut reg = LocalRegisterCopy::new(0);
        reg.write(
            PteFields::TYPE::Cache
                + PteFields::CACHE_SLOT.val(slot)
                + PteFields::CACHE_AGING.val(aging),
        );
        Pte(reg)
    }

    pub fn new_flash(index: u16, generic: bool) -> Pte {
        let mut reg = LocalRegisterCopy::new(0);
        reg.write(
            PteFields::TYPE::Flash
                + PteFields::FLASH_INDEX.val(index)
                + PteFields::FLASH_GENERIC.val(generic as u16),
        );
        Pte(reg)
    }

    pub fn ty(&self) -> PteType {
        match self.0.read(PteFields::TYPE) {
            0 => PteType::Invalid,
            1 => PteType::Sram,
            2 => PteType::Cache,
            _ => PteType::Flash,
        }
    }

    pub fn sram_page(&self) -> u16 {
        debug_assert_eq!(self.ty(), PteType::Sram);
        self.0.read(PteFields::SRAM_PAGE) as u16
    }

    pub fn cache_slot(&self) -> u16 {
        debug_assert_eq!(self.ty(), PteType::Cache);
        self.0.read(PteFields::CACHE_SLOT) as u16
    }

    pub fn cache_aging(&self) -> u16 {
        debug_assert_eq!(self.ty(), PteType::Cache);
        self.0.read(PteFields::CACHE_AGING) as u16
    }

    /// Decrements the aging counter in place, saturating at 0 (used by the
    /// clock hand as it sweeps past a slot it does not select).
    pub fn decrement_aging(&mut self) {
        let aging = self.cache_aging();
        if aging > 0 {
            let slot = self.cache_slot();
            *self = Pte::new_cache(slot, aging - 1);
        }
    }

    /// Increments the aging counter in place, saturating at the field's max
    /// (every write-through into an already-cached entry per §4.4).
    pub fn increment_aging(&mut self) {
        let aging = self.cache_aging();
        if aging < MAX_CACHE_AGING {
            let slot = self.cache_slot();
            *self = Pte::new_cache(slot, aging + 1);
        }
    }

    pub fn flash_index(&self) -> u16 {
        debug_assert_eq!(self.ty(), PteType::Flash);
        self.0.read(PteFields::FLASH_INDEX) as u16
    }

    pub fn flash_is_generic(&self) -> bool {
        debug_assert_eq!(self.ty(), PteType::Flash);
        self.0.is_set(PteFields::FLASH_GENERIC)
    }
}

impl Default for Pte {
    fn default() -> Pte {
        Pte::invalid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sram_round_trip() {
        let pte = Pte::new_sram(1000);
        assert_eq!(pte.ty(), PteType::Sram);
        assert_eq!(pte.sram_page(), 1000);
    }

    #[test]
    fn cache_round_trip_and_aging() {
        let mut pte = Pte::new_cache(200, INITIAL_CACHE_AGING);
        assert_eq!(pte.ty(), PteType::Cache);
        assert_eq!(pte.cache_slot(), 200);
        assert_eq!(pte.cache_aging(), 2);
        pte.decrement_aging();
        assert_eq!(pte.cache_aging(), 1);
        pte.decrement_aging();
        assert_eq!(pte.cache_aging(), 0);
        pte.decrement_aging();
        assert_eq!(pte.cache_aging(), 0);
        pte.increment_aging();
        assert_eq!(pte.cache_aging(), 1);
    }

    #[test]
    fn flash_generic_vs_swap() {
        let generic = Pte::new_flash(8191, true);
        assert!(generic.flash_is_generic());
        assert_eq!(generic.flash_index(), 8191);

        let swap = Pte::new_flash(42, false);
        assert!(!swap.flash_is_generic());
    }

    #[test]
    fn default_is_invalid() {
        assert_eq!(Pte::default().ty(), PteType::Invalid);
    }
}
