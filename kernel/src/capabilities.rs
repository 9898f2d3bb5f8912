//! Marker traits gating operations that should only be reachable from a
//! board's `main()`, the way the rest of the tree uses zero-sized
//! capabilities instead of `pub(crate)` to restrict a public API to one
//! call site without a visibility hack.

/// Possession of this capability authorizes calling the scheduler's main
/// loop. Only a board's `main()` should construct one.
pub unsafe trait MainLoopCapability {}

pub struct MainLoopCap;
unsafe impl MainLoopCapability for MainLoopCap {}
