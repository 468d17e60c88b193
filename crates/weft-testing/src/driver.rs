//! Helpers that play the host's part in the scheduler hand-off.

use std::sync::Arc;

use weft_scheduler::{Clock, DefaultHost, Scheduler};

use crate::clock::ManualClock;

/// Slices after which [`run_until_idle`] gives up on a scheduler that never
/// settles.
const MAX_SLICES: usize = 10_000;

/// Scheduler on a [`ManualClock`] starting at zero, driven by hand.
pub fn test_scheduler() -> (Scheduler, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    let scheduler = Scheduler::new(clock.clone(), Arc::new(DefaultHost));
    (scheduler, clock)
}

/// Runs one host callback if the scheduler asked for one.
pub fn run_slice(scheduler: &Scheduler) -> bool {
    if !scheduler.is_message_loop_running() {
        return false;
    }
    scheduler.perform_work_until_deadline();
    true
}

/// Runs slices and fires timeouts, jumping the clock forward to each pending
/// timeout, until no work is left. Returns the number of slices run.
///
/// # Panics
///
/// Panics if work is still pending after a large number of slices.
pub fn run_until_idle(scheduler: &Scheduler, clock: &ManualClock) -> usize {
    let mut slices = 0;
    loop {
        assert!(
            slices < MAX_SLICES,
            "scheduler still busy after {MAX_SLICES} slices"
        );
        if run_slice(scheduler) {
            slices += 1;
            continue;
        }
        match scheduler.host_timeout_deadline() {
            Some(deadline) => {
                clock.set(deadline);
                log::trace!("firing host timeout at {}", clock.now());
                scheduler.handle_timeout();
            }
            None => return slices,
        }
    }
}
