//! C7 (the scheduling half): a round-robin ready queue over zone-allocated
//! PCBs, pop head / run / push tail, same clock-hand structure as a classic
//! round-robin scheduler, scoped down to what this system's Non-goals leave
//! in scope — no timeslice bookkeeping across interrupts beyond the
//! periodic tick, no callback queue, no IPC, no dynamic deferred calls.
//! `Pcb` threads its own ready-list link (see `kernel::process`), so the
//! queue holds `&'a Pcb` directly rather than a separate wrapper node.

use crate::capabilities::MainLoopCapability;
use crate::common::list::List;
use crate::platform::{Chip, ContextSwitch};
use crate::process::{Pcb, ProcessType, State};
use crate::syscall::{ContextSwitchReason, Syscall};

/// §4.7 `sched_next`: pop head, push tail, return the new head. The process
/// that just ran keeps its place in line; whichever process is now at the
/// front is the next to receive the hardware thread.
pub struct RoundRobinSched<'a> {
    ready: List<'a, Pcb>,
}

impl<'a> RoundRobinSched<'a> {
    pub const fn new() -> RoundRobinSched<'a> {
        RoundRobinSched { ready: List::new() }
    }

    pub fn enqueue(&self, pcb: &'a Pcb) {
        self.ready.push_tail(pcb);
    }

    pub fn is_empty(&self) -> bool {
        self.ready.is_empty()
    }

    /// The process currently at the head of the queue, without rotating it.
    pub fn current(&self) -> Option<&'a Pcb> {
        self.ready.head()
    }

    pub fn sched_next(&self) -> Option<&'a Pcb> {
        if let Some(prev) = self.ready.pop_head() {
            self.ready.push_tail(prev);
        }
        self.ready.head()
    }
}

/// Drives `sched` forever: switch to whatever `sched_next` returns, or sleep
/// if the ready queue is empty. Requiring a [`MainLoopCapability`] restricts
/// this entry point to a board's `main()`, the same way the rest of this
/// tree uses zero-sized capabilities instead of `pub(crate)` to fence off a
/// public API to one call site.
pub fn run_loop<C: Chip>(sched: &RoundRobinSched<'_>, chip: &C, _cap: &dyn MainLoopCapability) -> ! {
    loop {
        match sched.sched_next() {
            Some(pcb) => {
                // Not behind a lock: exclusive access is justified the same
                // way `vm::fault` justifies it for its own tables — single
                // hardware thread, no reentry into this loop.
                let pcb_mut = unsafe { &mut *(pcb as *const Pcb as *mut Pcb) };
                pcb.set_state(State::Running);
                let reason = unsafe { chip.context_switch().switch_to_process(pcb_mut) };
                pcb.set_state(match reason {
                    ContextSwitchReason::SyscallFired { syscall: Syscall::YIELD } => State::Yielded,
                    ContextSwitchReason::Faulted => State::Running,
                });
            }
            None => chip.sleep(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ZoneId;
    use crate::zone::Zone;

    fn new_pcbs() -> Zone<Pcb, 4> {
        let zone: Zone<Pcb, 4> = Zone::new(ZoneId::Pcb, core::array::from_fn(|_| Pcb::default()));
        zone.zinit();
        zone
    }

    #[test]
    fn empty_queue_has_no_current_process() {
        let sched = RoundRobinSched::new();
        assert!(sched.is_empty());
        assert!(sched.current().is_none());
    }

    #[test]
    fn single_process_keeps_running() {
        let zone = new_pcbs();
        let idx = zone.zalloc().unwrap();
        let pcb: &'static Pcb = unsafe { &*(zone.get(idx) as *const Pcb) };
        let sched = RoundRobinSched::new();
        sched.enqueue(pcb);

        assert!(core::ptr::eq(sched.current().unwrap(), pcb));
        assert!(core::ptr::eq(sched.sched_next().unwrap(), pcb));
    }

    #[test]
    fn rotates_through_every_process_in_order() {
        let zone = new_pcbs();
        let a_idx = zone.zalloc().unwrap();
        let b_idx = zone.zalloc().unwrap();
        let a: &'static Pcb = unsafe { &*(zone.get(a_idx) as *const Pcb) };
        let b: &'static Pcb = unsafe { &*(zone.get(b_idx) as *const Pcb) };

        let sched = RoundRobinSched::new();
        sched.enqueue(a);
        sched.enqueue(b);

        assert!(core::ptr::eq(sched.current().unwrap(), a));
        assert!(core::ptr::eq(sched.sched_next().unwrap(), b));
        assert!(core::ptr::eq(sched.sched_next().unwrap(), a));
    }
}
