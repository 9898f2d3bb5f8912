//! Re-exports of the small, dependency-free building blocks shared across
//! the kernel and the chip/arch crates. Kept as a facade module, the way the
//! rest of the tree expects to `use crate::common::{cells::..., registers::...}`
//! rather than depending on the backing crates directly.

pub mod list;

pub mod cells {
    pub use tock_cells::{OptionalCell, TakeCell, VolatileCell};
}

pub mod registers {
    pub use tock_registers::{
        register_bitfields, CombinedFieldValue, Field, FieldValue, IntoFieldValue,
        LocalRegisterCopy, ReadOnly, ReadWrite, RegisterLongName, StaticRef, UIntLike, WriteOnly,
    };
}

pub use self::registers::StaticRef;
