//! Compile-time knobs. Per §6 of the design these are related by the data
//! model's invariants and may not be set independently: page size, MPU
//! subregion size, and the group/index/offset address split are one
//! identity, not three separate choices.

/// log2(page size in bytes). Page = 256 B.
pub const PAGE_OFFSET_BITS: usize = 8;
pub const PAGE_SIZE: usize = 1 << PAGE_OFFSET_BITS;

/// Pages per subregion (and PTEs per PTE group): a 4 KB MPU subregion is
/// exactly 16 software pages.
pub const INDEX_BITS: usize = 4;
pub const PAGES_PER_SUBREGION: usize = 1 << INDEX_BITS;

/// Subregions (top-level groups) covering the whole VM window: 64, one byte
/// each in the top-level table.
pub const GROUP_BITS: usize = 6;
pub const SUBREGION_COUNT: usize = 1 << GROUP_BITS;

/// Total VM-managed SRAM window: 2^18 B = 256 KiB.
pub const VM_WINDOW_BYTES: usize = 1 << (GROUP_BITS + INDEX_BITS + PAGE_OFFSET_BITS);

/// Base address of the VM-managed SRAM window. Cortex-M parts map SRAM at
/// 0x2000_0000; the window occupies the first 256 KiB of it.
pub const VM_BASE: usize = 0x2000_0000;
pub const VM_END: usize = VM_BASE + VM_WINDOW_BYTES;

/// Total SRAM pages in the VM window (group,index) concatenated: 10 bits.
pub const SRAM_PAGE_COUNT: usize = 1 << (GROUP_BITS + INDEX_BITS);

/// Subregions per 32 KB hardware region.
pub const SUBREGIONS_PER_REGION: usize = 8;
pub const REGION_COUNT: usize = SUBREGION_COUNT / SUBREGIONS_PER_REGION;
pub const SUBREGION_SIZE: usize = PAGES_PER_SUBREGION * PAGE_SIZE;
pub const REGION_SIZE: usize = SUBREGIONS_PER_REGION * SUBREGION_SIZE;

/// Zone capacities (§4.1). One byte is reserved as the INVALID sentinel in
/// both the top-level table entries and the process id space, so the
/// effective capacity is one less than the representable range.
pub const MAX_PROCESSES: usize = 15;
pub const PTE_GROUP_ZONE_SIZE: usize = 255;
pub const PTE_GROUP_TABLE_ZONE_SIZE: usize = MAX_PROCESSES;
pub const PCB_ZONE_SIZE: usize = MAX_PROCESSES;

pub const INVALID_PROCESS_ID: u8 = 0xF;
pub const INVALID_GROUP_INDEX: u8 = 0xFF;

/// Default write-cache slot count.
pub const WRITE_CACHE_SLOTS: usize = 256;

/// Flash swap window: page- and sector-granularity bookkeeping. These are
/// chip-specific in principle (flash geometry varies by part) but the core
/// spec fixes a default sized to this board's swap partition.
pub const FLASH_PAGE_SIZE: usize = PAGE_SIZE;
pub const FLASH_SECTOR_SIZE: usize = 4096;
pub const FLASH_PAGES_PER_SECTOR: usize = FLASH_SECTOR_SIZE / FLASH_PAGE_SIZE;
pub const FLASH_SWAP_PAGE_COUNT: usize = 1024;
pub const FLASH_SWAP_SECTOR_COUNT: usize = FLASH_SWAP_PAGE_COUNT / FLASH_PAGES_PER_SECTOR;

/// Initial program status register value installed into a freshly created
/// process's exception frame (§9 Open Question). Thumb bit (bit 24) set,
/// since the Cortex-M0 has no ARM state and an exception return with it
/// clear is UNPREDICTABLE; no exception-number field populated (a process
/// always starts in thread mode, not mid-exception); all condition flags
/// clear. Documented here rather than copied as a magic number.
pub const INITIAL_PSR: u32 = 1 << 24;
