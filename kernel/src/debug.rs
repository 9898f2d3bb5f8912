//! Kernel-wide debug logging. Mirrors the `debug!` macro used throughout the
//! tree (capsules and board crates call it the same way); the difference
//! here is the backend, since this system has no process console capsule to
//! route through. Output goes to a bounded in-RAM ring buffer so a
//! diagnostic survives long enough to be inspected after a panic halts the
//! system; a board crate wanting a live sink (semihosting, a UART) installs
//! one by writing its own `write_fmt` and swapping this module out.

use core::fmt;
use core::fmt::Write;
use core::cell::UnsafeCell;

const RING_BUFFER_LEN: usize = 1024;

struct RingBuffer {
    buf: UnsafeCell<[u8; RING_BUFFER_LEN]>,
    pos: UnsafeCell<usize>,
}

// Single-threaded by construction: only ever touched from exception context
// or from single-threaded host tests.
unsafe impl Sync for RingBuffer {}

impl RingBuffer {
    const fn new() -> RingBuffer {
        RingBuffer {
            buf: UnsafeCell::new([0; RING_BUFFER_LEN]),
            pos: UnsafeCell::new(0),
        }
    }
}

impl Write for &RingBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let buf = unsafe { &mut *self.buf.get() };
        let pos = unsafe { &mut *self.pos.get() };
        for &byte in s.as_bytes() {
            buf[*pos % RING_BUFFER_LEN] = byte;
            *pos += 1;
        }
        Ok(())
    }
}

static DEBUG_RING: RingBuffer = RingBuffer::new();

/// Writes a formatted line to the active debug sink. Not part of the public
/// API directly; go through [`debug!`].
pub fn write_fmt(args: fmt::Arguments) {
    let mut sink = &DEBUG_RING;
    let _ = sink.write_fmt(args);
}

#[macro_export]
macro_rules! debug {
    () => ({
        $crate::debug::write_fmt(format_args!("{}:{}: ", file!(), line!()));
        $crate::debug::write_fmt(format_args!("\r\n"));
    });
    ($msg:expr $(,)?) => ({
        $crate::debug::write_fmt(format_args!("{}:{}: {}\r\n", file!(), line!(), $msg));
    });
    ($fmt:expr, $($arg:tt)+) => ({
        $crate::debug::write_fmt(format_args!(concat!("{}:{}: ", $fmt, "\r\n"), file!(), line!(), $($arg)+));
    });
}

/// Like [`debug!`] but only emitted when `cond` holds; used on hot paths
/// (e.g. every fault) where unconditional formatting would be wasteful.
#[macro_export]
macro_rules! debug_gated {
    ($cond:expr, $($arg:tt)+) => ({
        if $cond {
            $crate::debug!($($arg)+);
        }
    });
}
