//! Standard runtime services backed by Rust's `std` library.
//!
//! This crate provides concrete implementations of the platform traits
//! defined in `weft-scheduler`. Applications construct a [`StdRuntime`],
//! hand its [`Scheduler`] to a reconciler, and call
//! [`StdRuntime::run_until_idle`] (or [`StdRuntime::pump`] from their own
//! event loop) to drive it.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread;
use std::time::{Duration, Instant};

use weft_scheduler::{Clock, HostScheduler, Millis, Scheduler, SchedulerConfig};

type Waker = Arc<dyn Fn() + Send + Sync + 'static>;

/// Host side of the scheduler hand-off: remembers what the scheduler asked
/// for until the event loop gets to it.
pub struct StdHost {
    callback_requested: AtomicBool,
    timeout_at: Mutex<Option<Instant>>,
    waker: RwLock<Option<Waker>>,
}

impl StdHost {
    pub fn new() -> Self {
        Self {
            callback_requested: AtomicBool::new(false),
            timeout_at: Mutex::new(None),
            waker: RwLock::new(None),
        }
    }

    /// Returns whether a callback has been requested since the last call.
    pub fn take_callback_request(&self) -> bool {
        self.callback_requested.swap(false, Ordering::SeqCst)
    }

    /// Time left until the armed timeout fires, zero when it is already due.
    pub fn timeout_remaining(&self) -> Option<Duration> {
        let timeout_at = *self.timeout_at.lock().unwrap_or_else(PoisonError::into_inner);
        timeout_at.map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Disarms the timeout if it is due. Returns whether it was.
    pub fn take_due_timeout(&self) -> bool {
        let mut timeout_at = self.timeout_at.lock().unwrap_or_else(PoisonError::into_inner);
        match *timeout_at {
            Some(at) if at <= Instant::now() => {
                *timeout_at = None;
                true
            }
            _ => false,
        }
    }

    /// Registers a waker invoked whenever the scheduler asks for attention.
    pub fn set_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        *self.waker.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(waker));
    }

    pub fn clear_waker(&self) {
        *self.waker.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn wake(&self) {
        let waker = self
            .waker
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(waker) = waker {
            waker();
        }
    }
}

impl Default for StdHost {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StdHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdHost")
            .field(
                "callback_requested",
                &self.callback_requested.load(Ordering::SeqCst),
            )
            .field("timeout_remaining", &self.timeout_remaining())
            .finish()
    }
}

impl HostScheduler for StdHost {
    fn request_host_callback(&self) {
        self.callback_requested.store(true, Ordering::SeqCst);
        self.wake();
    }

    fn request_host_timeout(&self, delay: Millis) {
        let at = Instant::now() + Duration::from_millis(delay);
        *self.timeout_at.lock().unwrap_or_else(PoisonError::into_inner) = Some(at);
        self.wake();
    }

    fn cancel_host_timeout(&self) {
        *self.timeout_at.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Clock implementation backed by [`std::time`], counting milliseconds since
/// it was created.
#[derive(Debug, Clone)]
pub struct StdClock {
    origin: Instant,
}

impl StdClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    /// Returns the elapsed time as a [`Duration`] for convenience.
    pub fn elapsed(&self) -> Duration {
        self.origin.elapsed()
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    fn now(&self) -> Millis {
        self.origin.elapsed().as_millis() as Millis
    }
}

/// Convenience container bundling a scheduler with the standard host and clock.
#[derive(Clone)]
pub struct StdRuntime {
    scheduler: Scheduler,
    host: Arc<StdHost>,
    clock: Arc<StdClock>,
}

impl StdRuntime {
    pub fn new() -> Self {
        Self::with_config(SchedulerConfig::default())
    }

    pub fn with_config(config: SchedulerConfig) -> Self {
        let host = Arc::new(StdHost::default());
        let clock = Arc::new(StdClock::default());
        let scheduler = Scheduler::with_config(clock.clone(), host.clone(), config);
        Self {
            scheduler,
            host,
            clock,
        }
    }

    /// Returns a handle to the scheduler.
    pub fn scheduler(&self) -> Scheduler {
        self.scheduler.clone()
    }

    pub fn host(&self) -> Arc<StdHost> {
        Arc::clone(&self.host)
    }

    pub fn clock(&self) -> Arc<StdClock> {
        Arc::clone(&self.clock)
    }

    /// Serves one pending request: a slice of work, or a due timeout.
    /// Returns `false` when nothing was ready.
    pub fn pump(&self) -> bool {
        if self.host.take_callback_request() {
            self.scheduler.perform_work_until_deadline();
            return true;
        }
        if self.host.take_due_timeout() {
            self.scheduler.handle_timeout();
            return true;
        }
        false
    }

    /// Pumps until no work is left, sleeping through armed timeouts.
    pub fn run_until_idle(&self) {
        loop {
            if self.pump() {
                continue;
            }
            match self.host.timeout_remaining() {
                Some(remaining) => {
                    log::trace!("sleeping {remaining:?} until the next timer");
                    thread::sleep(remaining);
                }
                None => return,
            }
        }
    }
}

impl fmt::Debug for StdRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRuntime")
            .field("scheduler", &self.scheduler)
            .field("host", &self.host)
            .field("clock", &self.clock)
            .finish()
    }
}

impl Default for StdRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::atomic::AtomicUsize;

    use weft_scheduler::{Continuation, Priority, ScheduleOptions};

    use super::*;

    #[test]
    fn std_runtime_runs_ready_and_delayed_tasks() {
        let runtime = StdRuntime::new();
        let scheduler = runtime.scheduler();
        let log = Rc::new(RefCell::new(Vec::new()));

        for (name, delay) in [("later", 5), ("now", 0)] {
            let log = Rc::clone(&log);
            scheduler.schedule_callback(
                Priority::Normal,
                move |_| {
                    log.borrow_mut().push(name);
                    Continuation::Done
                },
                ScheduleOptions::delayed(delay),
            );
        }

        runtime.run_until_idle();

        assert_eq!(*log.borrow(), vec!["now", "later"]);
        assert!(!scheduler.has_pending_work());
    }

    #[test]
    fn continuation_is_served_on_the_next_pump() {
        let runtime = StdRuntime::new();
        let scheduler = runtime.scheduler();
        let steps = Rc::new(RefCell::new(0));

        let counter = Rc::clone(&steps);
        scheduler.schedule_callback(
            Priority::UserBlocking,
            move |_| {
                *counter.borrow_mut() += 1;
                Continuation::resume(move |_| {
                    *counter.borrow_mut() += 1;
                    Continuation::Done
                })
            },
            ScheduleOptions::default(),
        );

        assert!(runtime.pump());
        assert_eq!(*steps.borrow(), 1);
        assert!(runtime.pump());
        assert_eq!(*steps.borrow(), 2);
        assert!(!runtime.pump());
    }

    #[test]
    fn waker_fires_on_callback_request() {
        let runtime = StdRuntime::new();
        let wakes = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&wakes);
        runtime.host().set_waker(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        runtime.scheduler().schedule_callback(
            Priority::Normal,
            |_| Continuation::Done,
            ScheduleOptions::default(),
        );

        assert_eq!(wakes.load(Ordering::SeqCst), 1);
        runtime.host().clear_waker();
        runtime.run_until_idle();
        assert_eq!(wakes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn std_clock_is_monotonic() {
        let clock = StdClock::new();
        let first = clock.now();
        thread::sleep(Duration::from_millis(2));
        assert!(clock.now() >= first + 1);
    }
}
