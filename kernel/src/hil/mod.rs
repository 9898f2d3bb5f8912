//! Hardware interface layer: traits a chip crate implements and the kernel
//! (or a capsule, if this tree grew one) programs against, so VM code never
//! names a concrete chip type.

pub mod flash;
