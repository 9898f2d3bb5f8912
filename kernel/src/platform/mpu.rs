//! C2's hardware-independent contract. `arch_cortex_m0::mpu::Cortexm0Mpu`
//! is the only implementation, but keeping the trait here lets `vm::fault`
//! and `sched` be compiled and unit-tested without it.

/// Identifies a 4 KB subregion by its VM-window offset; always a multiple
/// of `config::SUBREGION_SIZE`.
pub type SubregionBase = usize;

pub trait Mpu {
    /// Assigns one MPU region per 32 KB SRAM slice, all subregions
    /// disabled, plus a privileged-only no-execute background region.
    fn mpu_init(&self);

    /// Clears the disable bit for the subregion covering `addr`.
    /// Precondition: `addr` lies in the VM-managed SRAM window.
    fn mpu_enable_subregion(&self, addr: usize);

    /// Re-asserts every subregion's disable bit; called on every context
    /// switch so the incoming process faults its way back in.
    fn mpu_disable_all_subregions(&self);

    /// Scans regions from highest priority down, honoring enable/SRD/XN,
    /// to decide whether `addr` is currently executable.
    fn mpu_instruction_executable(&self, addr: usize) -> bool;

    fn enable_mpu(&self);
    fn disable_mpu(&self);
}
