//! C5: the flash swap manager. Tracks which swap-region pages are occupied
//! and which sectors have never been erased since boot, grounded on the
//! reference kernel's `vm_procure_flash_page` (page bitmap scan, falling
//! back to a sector erase, falling back to a panic).
//!
//! Reading flash is a plain memory-mapped load on NOR flash (execute in
//! place), so it never goes through an asynchronous driver; only erase and
//! program do, which is what [`FlashBackend`] exposes. `chips_rp2040::flash`
//! implements it over `kernel::hil::flash::Flash`'s async read/write/erase
//! contract by polling to completion before returning, the same way every
//! chip flash driver in this tree's `hil::flash` family busy-waits beneath
//! its async surface during early boot before interrupts are live.

use crate::config;
use crate::error::KernelError;
use crate::vm::bitmap::{self, Bitmap};
use crate::vm::pte::Pte;
use core::cell::Cell;

pub const PAGE_COUNT: usize = config::FLASH_SWAP_PAGE_COUNT;
pub const SECTOR_COUNT: usize = config::FLASH_SWAP_SECTOR_COUNT;
const PAGE_BITMAP_BYTES: usize = PAGE_COUNT / 8;
const SECTOR_BITMAP_BYTES: usize = SECTOR_COUNT / 8;

/// A flash page locator distinguishing "generic" (direct-from-binary,
/// read-only) pages from "swap" (evicted write-cache entries) pages — one
/// reserved bit of the PTE's 13-bit flash index (§9 Open Question).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashIndex {
    index: u16,
    generic: bool,
}

impl FlashIndex {
    pub fn swap(index: u16) -> FlashIndex {
        FlashIndex { index, generic: false }
    }

    pub fn generic(index: u16) -> FlashIndex {
        FlashIndex { index, generic: true }
    }

    pub fn from_pte(pte: &Pte) -> FlashIndex {
        FlashIndex { index: pte.flash_index(), generic: pte.flash_is_generic() }
    }

    pub fn index(&self) -> u16 {
        self.index
    }

    pub fn is_generic(&self) -> bool {
        self.generic
    }
}

/// The erase/program half of a chip's flash driver, plus the read access
/// the VM fault path needs to resolve a `FLASH` PTE's contents. Blocking:
/// every call returns only once the operation has completed, since the
/// fault handler runs to completion with preemption disabled and has
/// nowhere to suspend to while waiting on a callback.
pub trait FlashBackend {
    /// Contents of the page named by `index`, resolved against either the
    /// generic (binary image) or swap region depending on `index.is_generic()`.
    fn page(&self, index: FlashIndex) -> &[u8];

    fn program_page(&self, index: FlashIndex, data: &[u8]) -> Result<(), KernelError>;

    fn erase_sector(&self, sector: u16) -> Result<(), KernelError>;

    /// Debug-mode wear check (§4.5): every byte of a freshly erased sector
    /// must read back as `0xFF`.
    #[cfg(feature = "flash_wear_check")]
    fn verify_erased(&self, sector: u16) -> bool;
}

pub struct FlashSwap {
    page_bitmap: Bitmap<PAGE_BITMAP_BYTES>,
    page_cursor: Cell<usize>,
    sector_bitmap: Bitmap<SECTOR_BITMAP_BYTES>,
    sector_cursor: Cell<usize>,
}

unsafe impl Sync for FlashSwap {}

impl FlashSwap {
    pub const fn new() -> FlashSwap {
        FlashSwap {
            page_bitmap: Bitmap::new(),
            page_cursor: Cell::new(0),
            sector_bitmap: Bitmap::new(),
            sector_cursor: Cell::new(0),
        }
    }

    /// §4.5 `procure_flash_page`.
    pub fn procure_page<B: FlashBackend>(&self, backend: &B) -> Result<FlashIndex, KernelError> {
        if let Some(page) = bitmap::find_and_set_first_zero(&self.page_bitmap, PAGE_COUNT, self.page_cursor.get()) {
            self.page_cursor.set(page + 1);
            return Ok(FlashIndex::swap(page as u16));
        }

        let sector = bitmap::find_and_set_first_zero(&self.sector_bitmap, SECTOR_COUNT, self.sector_cursor.get())
            .ok_or(KernelError::NoFlashSpace)?;
        self.sector_cursor.set(sector + 1);

        backend.erase_sector(sector as u16)?;

        #[cfg(feature = "flash_wear_check")]
        if !backend.verify_erased(sector as u16) {
            return Err(KernelError::FlashWearFailure);
        }

        let pages_per_sector = config::FLASH_PAGES_PER_SECTOR;
        let first_page = sector * pages_per_sector;
        self.page_bitmap.set(first_page);
        for page in (first_page + 1)..(first_page + pages_per_sector) {
            self.page_bitmap.clear(page);
        }

        Ok(FlashIndex::swap(first_page as u16))
    }

    /// Abandons a swap page back to the free bitmap. Rejects `index` if it
    /// names a generic-flash page: those are never written back, so freeing
    /// one into the swap bitmap would be a programming error (§9 Open
    /// Question resolution).
    pub fn free_page(&self, index: FlashIndex) -> Result<(), KernelError> {
        if index.is_generic() {
            return Err(KernelError::InvariantViolation);
        }
        self.page_bitmap.clear(index.index() as usize);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::vec::Vec;

    struct FakeFlash {
        pages: core::cell::UnsafeCell<Vec<[u8; config::FLASH_PAGE_SIZE]>>,
        erases: Cell<u32>,
    }

    impl FakeFlash {
        fn new() -> FakeFlash {
            FakeFlash {
                pages: core::cell::UnsafeCell::new(vec![[0xFFu8; config::FLASH_PAGE_SIZE]; PAGE_COUNT]),
                erases: Cell::new(0),
            }
        }

        #[allow(clippy::mut_from_ref)]
        fn pages(&self) -> &mut Vec<[u8; config::FLASH_PAGE_SIZE]> {
            unsafe { &mut *self.pages.get() }
        }
    }

    impl FlashBackend for FakeFlash {
        fn page(&self, index: FlashIndex) -> &[u8] {
            &self.pages()[index.index() as usize]
        }

        fn program_page(&self, index: FlashIndex, data: &[u8]) -> Result<(), KernelError> {
            self.pages()[index.index() as usize][..data.len()].copy_from_slice(data);
            Ok(())
        }

        fn erase_sector(&self, sector: u16) -> Result<(), KernelError> {
            self.erases.set(self.erases.get() + 1);
            let first = sector as usize * config::FLASH_PAGES_PER_SECTOR;
            for p in first..first + config::FLASH_PAGES_PER_SECTOR {
                self.pages()[p] = [0xFF; config::FLASH_PAGE_SIZE];
            }
            Ok(())
        }

        #[cfg(feature = "flash_wear_check")]
        fn verify_erased(&self, sector: u16) -> bool {
            let first = sector as usize * config::FLASH_PAGES_PER_SECTOR;
            (first..first + config::FLASH_PAGES_PER_SECTOR).all(|p| self.pages()[p].iter().all(|&b| b == 0xFF))
        }
    }

    #[test]
    fn first_procurements_come_from_an_erased_sector() {
        let swap = FlashSwap::new();
        let backend = FakeFlash::new();
        let first = swap.procure_page(&backend).unwrap();
        assert!(!first.is_generic());
        assert_eq!(first.index(), 0);
        assert_eq!(backend.erases.get(), 1);
    }

    #[test]
    fn exhausting_pages_erases_another_sector() {
        let swap = FlashSwap::new();
        let backend = FakeFlash::new();
        let pages_per_sector = config::FLASH_PAGES_PER_SECTOR;
        for _ in 0..pages_per_sector {
            swap.procure_page(&backend).unwrap();
        }
        assert_eq!(backend.erases.get(), 1);
        let next = swap.procure_page(&backend).unwrap();
        assert_eq!(backend.erases.get(), 2);
        assert_eq!(next.index() as usize, pages_per_sector);
    }

    #[test]
    fn freeing_a_generic_index_is_rejected() {
        let swap = FlashSwap::new();
        assert_eq!(swap.free_page(FlashIndex::generic(5)), Err(KernelError::InvariantViolation));
    }

    #[test]
    fn freeing_a_swap_index_clears_its_bit() {
        let swap = FlashSwap::new();
        let backend = FakeFlash::new();
        let page = swap.procure_page(&backend).unwrap();
        swap.free_page(page).unwrap();
        assert_eq!(swap.procure_page(&backend).unwrap(), page);
    }
}
