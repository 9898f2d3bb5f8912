//! Asynchronous flash driver interface. The flash swap manager (C5) issues
//! page program/erase requests through this trait and gets the result back
//! through a `Client` callback rather than blocking, the same shape every
//! chip's flash driver in this tree exposes.

use crate::ReturnCode;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Error {
    CommandComplete,
    FlashError,
}

pub trait Flash {
    /// A chip's native flash page buffer type, usually a fixed-size byte
    /// array wrapper sized to the page granularity that chip actually
    /// programs in hardware.
    type Page: AsMut<[u8]> + Default + 'static;

    fn read_page(
        &self,
        page_number: usize,
        buf: &'static mut Self::Page,
    ) -> Result<(), (ReturnCode, &'static mut Self::Page)>;

    fn write_page(
        &self,
        page_number: usize,
        buf: &'static mut Self::Page,
    ) -> Result<(), (ReturnCode, &'static mut Self::Page)>;

    fn erase_sector(&self, sector_number: usize) -> ReturnCode;
}

pub trait Client<F: Flash> {
    fn read_complete(&self, buffer: &'static mut F::Page, error: Error);
    fn write_complete(&self, buffer: &'static mut F::Page, error: Error);
    fn erase_complete(&self, error: Error);
}

pub trait HasClient<'a, C> {
    fn set_client(&self, client: &'a C);
}
