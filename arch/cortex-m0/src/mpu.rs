//! `kernel::platform::mpu::Mpu` for the Cortex-M0's eight-region MPU.
//!
//! Grounded on the reference kernel's `mpu_find_covering_region`,
//! `mpu_instruction_executable`, `mpu_disable_all_subregions`,
//! `mpu_enable_subregion` and `mpu_init`. The RASR/RBAR bit layout below
//! follows the same `register_bitfields!`/`ReadWrite<u32, _>` idiom this
//! tree's other MMIO drivers use for their register blocks (see
//! `chips_rp2040::flash::SsiRegisters`), not the TEX/S/C/B cacheability
//! split a Cortex-M7 MPU exposes — the M0 MPU has none of that, only
//! enable/size/SRD/AP/XN.
//!
//! One region per 32 KB VM-window slice uses up all eight of the M0's MPU
//! regions (§ the VM window is exactly `REGION_COUNT * REGION_SIZE`
//! bytes), so unlike the reference kernel there is no spare region left to
//! dedicate to a background deny-all slice. `CTRL.PRIVDEFENA` does that job
//! instead: privileged (kernel) code falls back to the chip's default
//! memory map wherever no region is enabled, while unprivileged (process)
//! code always faults outside an active region regardless of that bit, by
//! architecture. So the doc comment on `Mpu::mpu_init` ("plus a
//! privileged-only no-execute background region") is realized by that one
//! control bit rather than a ninth region, because there is no ninth
//! region to spend on it.

use kernel::common::registers::{register_bitfields, ReadOnly, ReadWrite, StaticRef};
use kernel::config;
use kernel::platform::mpu::Mpu;

register_bitfields![u32,
    Ctrl [
        ENABLE OFFSET(0) NUMBITS(1) [],
        HFNMIENA OFFSET(1) NUMBITS(1) [],
        PRIVDEFENA OFFSET(2) NUMBITS(1) []
    ],
    Rnr [
        REGION OFFSET(0) NUMBITS(8) []
    ],
    Rbar [
        REGION OFFSET(0) NUMBITS(4) [],
        VALID OFFSET(4) NUMBITS(1) [],
        ADDR OFFSET(5) NUMBITS(27) []
    ],
    Rasr [
        ENABLE OFFSET(0) NUMBITS(1) [],
        SIZE OFFSET(1) NUMBITS(5) [],
        SRD OFFSET(8) NUMBITS(8) [],
        BUFFERABLE OFFSET(16) NUMBITS(1) [],
        CACHEABLE OFFSET(17) NUMBITS(1) [],
        SHAREABLE OFFSET(18) NUMBITS(1) [],
        AP OFFSET(24) NUMBITS(3) [
            NoAccess = 0b000,
            PrivilegedOnly = 0b001,
            PrivilegedReadWriteUnprivilegedReadOnly = 0b010,
            ReadWrite = 0b011,
            PrivilegedReadOnly = 0b101,
            ReadOnly = 0b110
        ],
        XN OFFSET(28) NUMBITS(1) []
    ]
];

#[repr(C)]
struct MpuRegisters {
    mpu_type: ReadOnly<u32>,
    ctrl: ReadWrite<u32, Ctrl::Register>,
    rnr: ReadWrite<u32, Rnr::Register>,
    rbar: ReadWrite<u32, Rbar::Register>,
    rasr: ReadWrite<u32, Rasr::Register>,
}

const MPU_BASE: StaticRef<MpuRegisters> = unsafe { StaticRef::new(0xE000_ED90 as *const MpuRegisters) };

pub const NUM_REGIONS: usize = config::REGION_COUNT;

/// A region's decoded configuration, independent of whether it came from
/// real registers or a test fixture. `mpu_find_covering_region` and
/// `mpu_instruction_executable` operate purely on this, so both are
/// testable on host without touching hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionDescriptor {
    pub base: usize,
    pub size_bits: u32,
    pub srd: u8,
    pub enable: bool,
    pub xn: bool,
}

impl RegionDescriptor {
    pub fn disabled() -> RegionDescriptor {
        RegionDescriptor { base: 0, size_bits: 0, srd: 0xFF, enable: false, xn: true }
    }

    fn size_bytes(&self) -> usize {
        1usize << (self.size_bits as usize + 1)
    }

    fn subregion_size(&self) -> usize {
        self.size_bytes() / 8
    }

    fn subregion_index(&self, addr: usize) -> usize {
        (addr - self.base) / self.subregion_size()
    }

    /// Whether `addr` falls within this region, the region is enabled, and
    /// the specific subregion covering it is not SRD-disabled.
    pub fn covers(&self, addr: usize) -> bool {
        self.enable
            && addr >= self.base
            && addr < self.base + self.size_bytes()
            && (self.srd & (1 << self.subregion_index(addr))) == 0
    }
}

/// Scans from the highest-numbered region down, since higher-numbered
/// regions win when more than one covers the same address.
pub fn mpu_find_covering_region(regions: &[RegionDescriptor], addr: usize) -> Option<usize> {
    for i in (0..regions.len()).rev() {
        if regions[i].covers(addr) {
            return Some(i);
        }
    }
    None
}

pub fn mpu_instruction_executable(regions: &[RegionDescriptor], addr: usize) -> bool {
    match mpu_find_covering_region(regions, addr) {
        Some(i) => !regions[i].xn,
        None => false,
    }
}

pub struct Cortexm0Mpu {
    registers: StaticRef<MpuRegisters>,
}

impl Cortexm0Mpu {
    /// # Safety
    /// Must be constructed at most once; the MPU is a single piece of
    /// hardware, not something multiple owners can share.
    pub const unsafe fn new() -> Cortexm0Mpu {
        Cortexm0Mpu { registers: MPU_BASE }
    }

    fn select_region(&self, region: usize) {
        self.registers.rnr.write(Rnr::REGION.val(region as u32));
    }

    fn read_descriptor(&self, region: usize) -> RegionDescriptor {
        self.select_region(region);
        RegionDescriptor {
            base: (self.registers.rbar.get() & !0x1F) as usize,
            size_bits: self.registers.rasr.read(Rasr::SIZE),
            srd: self.registers.rasr.read(Rasr::SRD) as u8,
            enable: self.registers.rasr.is_set(Rasr::ENABLE),
            xn: self.registers.rasr.is_set(Rasr::XN),
        }
    }

    fn snapshot(&self) -> [RegionDescriptor; NUM_REGIONS] {
        core::array::from_fn(|i| self.read_descriptor(i))
    }

    fn region_of(addr: usize) -> usize {
        (addr - config::VM_BASE) / config::REGION_SIZE
    }

    fn subregion_of(addr: usize) -> usize {
        ((addr - config::VM_BASE) / config::SUBREGION_SIZE) % 8
    }
}

impl Mpu for Cortexm0Mpu {
    fn mpu_init(&self) {
        for i in 0..NUM_REGIONS {
            let base = config::VM_BASE + i * config::REGION_SIZE;
            self.select_region(i);
            // Full-word writes only: RBAR/RASR do not tolerate byte/half
            // stores, so every access here goes through a single `write`
            // or `modify` call rather than field-at-a-time stores.
            self.registers
                .rbar
                .write(Rbar::ADDR.val((base >> 5) as u32) + Rbar::VALID::SET + Rbar::REGION.val(i as u32));
            self.registers.rasr.write(
                Rasr::ENABLE::SET
                    + Rasr::SIZE.val((config::REGION_SIZE.trailing_zeros() - 1) as u32)
                    + Rasr::SRD.val(0b1111_1111)
                    + Rasr::CACHEABLE::SET
                    + Rasr::AP::ReadWrite
                    + Rasr::XN::CLEAR,
            );
        }

        self.registers.ctrl.write(Ctrl::ENABLE::SET + Ctrl::PRIVDEFENA::SET);
    }

    fn mpu_enable_subregion(&self, addr: usize) {
        let region = Self::region_of(addr);
        let subregion = Self::subregion_of(addr);
        self.select_region(region);
        let srd = self.registers.rasr.read(Rasr::SRD);
        self.registers.rasr.modify(Rasr::SRD.val(srd & !(1 << subregion)));
    }

    fn mpu_disable_all_subregions(&self) {
        for i in 0..NUM_REGIONS {
            self.select_region(i);
            self.registers.rasr.modify(Rasr::SRD.val(0b1111_1111));
        }
    }

    fn mpu_instruction_executable(&self, addr: usize) -> bool {
        let regions = self.snapshot();
        mpu_instruction_executable(&regions, addr)
    }

    fn enable_mpu(&self) {
        self.registers.ctrl.modify(Ctrl::ENABLE::SET);
    }

    fn disable_mpu(&self) {
        self.registers.ctrl.modify(Ctrl::ENABLE::CLEAR);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(base: usize, size_bits: u32, srd: u8, xn: bool) -> RegionDescriptor {
        RegionDescriptor { base, size_bits, srd, enable: true, xn }
    }

    #[test]
    fn higher_numbered_region_wins_on_overlap() {
        let mut regions = [RegionDescriptor::disabled(); 8];
        // Region 0 covers all of SRAM; region 5 covers just one 32 KB slice
        // within it. The address lands in both; region 5 must win.
        regions[0] = region(config::VM_BASE, 17, 0, true);
        regions[5] = region(config::VM_BASE + 5 * config::REGION_SIZE, 14, 0, false);

        let addr = config::VM_BASE + 5 * config::REGION_SIZE + 10;
        assert_eq!(mpu_find_covering_region(&regions, addr), Some(5));
        assert!(mpu_instruction_executable(&regions, addr));
    }

    #[test]
    fn disabled_subregion_is_not_covered() {
        let mut regions = [RegionDescriptor::disabled(); 8];
        // 32 KB region split into 8 subregions of 4 KB; disable subregion 2.
        regions[3] = region(config::VM_BASE + 3 * config::REGION_SIZE, 14, 0b0000_0100, false);

        let subregion_2_addr = config::VM_BASE + 3 * config::REGION_SIZE + 2 * config::SUBREGION_SIZE + 4;
        assert_eq!(mpu_find_covering_region(&regions, subregion_2_addr), None);

        let subregion_3_addr = config::VM_BASE + 3 * config::REGION_SIZE + 3 * config::SUBREGION_SIZE + 4;
        assert_eq!(mpu_find_covering_region(&regions, subregion_3_addr), Some(3));
    }

    #[test]
    fn out_of_range_address_is_uncovered_and_not_executable() {
        let regions = [RegionDescriptor::disabled(); 8];
        let addr = config::VM_BASE + config::VM_WINDOW_BYTES + 4096;
        assert_eq!(mpu_find_covering_region(&regions, addr), None);
        assert!(!mpu_instruction_executable(&regions, addr));
    }

    #[test]
    fn execute_never_region_blocks_instruction_fetch() {
        let mut regions = [RegionDescriptor::disabled(); 8];
        regions[1] = region(config::VM_BASE + config::REGION_SIZE, 14, 0, true);
        let addr = config::VM_BASE + config::REGION_SIZE + 8;
        assert_eq!(mpu_find_covering_region(&regions, addr), Some(1));
        assert!(!mpu_instruction_executable(&regions, addr));
    }
}
