//! Platform abstraction traits for the scheduler.
//!
//! The scheduler never blocks or spawns on its own. It asks the host to call
//! back into it ([`Scheduler::perform_work_until_deadline`]) or to wake it
//! after a delay ([`Scheduler::handle_timeout`]), and it reads time through a
//! [`Clock`] so tests can drive it deterministically.
//!
//! [`Scheduler::perform_work_until_deadline`]: crate::Scheduler::perform_work_until_deadline
//! [`Scheduler::handle_timeout`]: crate::Scheduler::handle_timeout

use crate::Millis;

/// Hand-off primitive between the scheduler and the surrounding event loop.
pub trait HostScheduler: Send + Sync {
    /// Ask the host to call `perform_work_until_deadline` soon, after yielding
    /// to any other pending host work.
    fn request_host_callback(&self);

    /// Ask the host to call `handle_timeout` once `delay` milliseconds pass.
    fn request_host_timeout(&self, delay: Millis);

    /// Withdraw the last timeout request.
    fn cancel_host_timeout(&self);
}

/// Monotonic time source in milliseconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> Millis;
}

/// Host that ignores every request. The owner drives the scheduler by hand,
/// polling [`Scheduler::is_message_loop_running`](crate::Scheduler::is_message_loop_running)
/// and [`Scheduler::host_timeout_deadline`](crate::Scheduler::host_timeout_deadline).
#[derive(Debug, Default)]
pub struct DefaultHost;

impl HostScheduler for DefaultHost {
    fn request_host_callback(&self) {}

    fn request_host_timeout(&self, _delay: Millis) {}

    fn cancel_host_timeout(&self) {}
}

#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct TestClock {
    now: std::sync::atomic::AtomicU64,
}

#[cfg(test)]
impl TestClock {
    pub(crate) fn advance(&self, millis: Millis) {
        self.now
            .fetch_add(millis, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(test)]
impl Clock for TestClock {
    fn now(&self) -> Millis {
        self.now.load(std::sync::atomic::Ordering::SeqCst)
    }
}
