use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use crate::heap::{HeapNode, MinHeap};
use crate::platform::{Clock, HostScheduler};
use crate::priority::{Priority, SchedulerConfig};
use crate::Millis;

/// A unit of schedulable work.
///
/// The callback runs at most once. It either finishes ([`Continuation::Done`])
/// or hands back the rest of its work ([`Continuation::Resume`]), which keeps
/// the task's identity and position in the queue.
pub type Callback = Box<dyn FnOnce(&TaskContext<'_>) -> Continuation + 'static>;

pub enum Continuation {
    Done,
    Resume(Callback),
}

impl Continuation {
    pub fn resume(callback: impl FnOnce(&TaskContext<'_>) -> Continuation + 'static) -> Self {
        Continuation::Resume(Box::new(callback))
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Continuation::Done)
    }
}

impl fmt::Debug for Continuation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Continuation::Done => f.write_str("Done"),
            Continuation::Resume(_) => f.write_str("Resume(..)"),
        }
    }
}

/// What a running callback can see about its own execution.
pub struct TaskContext<'a> {
    scheduler: &'a Scheduler,
    task: TaskId,
    did_timeout: bool,
}

impl<'a> TaskContext<'a> {
    /// True when the task was already past its expiration time when it
    /// started. Overdue work should run to completion instead of yielding.
    pub fn did_timeout(&self) -> bool {
        self.did_timeout
    }

    pub fn should_yield(&self) -> bool {
        self.scheduler.should_yield_to_host()
    }

    pub fn task_id(&self) -> TaskId {
        self.task
    }

    pub fn scheduler(&self) -> &'a Scheduler {
        self.scheduler
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

pub(crate) struct Task {
    id: TaskId,
    priority: Priority,
    start_time: Millis,
    expiration_time: Millis,
    sort_index: Cell<Millis>,
    callback: RefCell<Option<Callback>>,
    cancelled: Cell<bool>,
}

impl Task {
    fn has_callback(&self) -> bool {
        self.callback.borrow().is_some()
    }
}

impl HeapNode for Task {
    fn id(&self) -> u64 {
        self.id.0
    }

    fn sort_index(&self) -> u64 {
        self.sort_index.get()
    }
}

/// Caller-side reference to a scheduled task, used for cancellation.
#[derive(Clone)]
pub struct TaskHandle {
    task: Rc<Task>,
}

impl TaskHandle {
    pub fn id(&self) -> TaskId {
        self.task.id
    }

    pub fn priority(&self) -> Priority {
        self.task.priority
    }

    pub fn start_time(&self) -> Millis {
        self.task.start_time
    }

    pub fn expiration_time(&self) -> Millis {
        self.task.expiration_time
    }

    /// Whether the task still has work queued (not finished, not cancelled).
    pub fn is_pending(&self) -> bool {
        self.task.has_callback()
    }

    pub fn is_cancelled(&self) -> bool {
        self.task.cancelled.get()
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.task.id)
            .field("priority", &self.task.priority)
            .field("start_time", &self.task.start_time)
            .field("expiration_time", &self.task.expiration_time)
            .field("pending", &self.is_pending())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleOptions {
    /// Milliseconds to wait before the task becomes runnable. Zero means ready now.
    pub delay: Millis,
}

impl ScheduleOptions {
    pub fn delayed(delay: Millis) -> Self {
        Self { delay }
    }
}

struct SchedulerInner {
    config: SchedulerConfig,
    clock: Arc<dyn Clock>,
    host: Arc<dyn HostScheduler>,
    task_queue: RefCell<MinHeap<Rc<Task>>>,
    timer_queue: RefCell<MinHeap<Rc<Task>>>,
    next_task_id: Cell<u64>,
    current_task: RefCell<Option<Rc<Task>>>,
    current_priority: Cell<Priority>,
    slice_start: Cell<Millis>,
    is_performing_work: Cell<bool>,
    is_host_callback_scheduled: Cell<bool>,
    is_message_loop_running: Cell<bool>,
    host_timeout: Cell<Option<Millis>>,
}

/// Single-threaded cooperative scheduler with a ready heap and a delayed heap.
///
/// Cloning yields another handle to the same queues.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<SchedulerInner>,
}

impl Scheduler {
    pub fn new(clock: Arc<dyn Clock>, host: Arc<dyn HostScheduler>) -> Self {
        Self::with_config(clock, host, SchedulerConfig::default())
    }

    pub fn with_config(
        clock: Arc<dyn Clock>,
        host: Arc<dyn HostScheduler>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            inner: Rc::new(SchedulerInner {
                config,
                clock,
                host,
                task_queue: RefCell::new(MinHeap::new()),
                timer_queue: RefCell::new(MinHeap::new()),
                next_task_id: Cell::new(1),
                current_task: RefCell::new(None),
                current_priority: Cell::new(Priority::NoPriority),
                slice_start: Cell::new(0),
                is_performing_work: Cell::new(false),
                is_host_callback_scheduled: Cell::new(false),
                is_message_loop_running: Cell::new(false),
                host_timeout: Cell::new(None),
            }),
        }
    }

    pub fn config(&self) -> SchedulerConfig {
        self.inner.config
    }

    pub fn now(&self) -> Millis {
        self.inner.clock.now()
    }

    pub fn schedule_callback(
        &self,
        priority: Priority,
        callback: impl FnOnce(&TaskContext<'_>) -> Continuation + 'static,
        options: ScheduleOptions,
    ) -> TaskHandle {
        let inner = &self.inner;
        let current_time = inner.clock.now();
        let start_time = if options.delay > 0 {
            current_time.saturating_add(options.delay)
        } else {
            current_time
        };
        let expiration_time = inner.config.expiration_time(priority, start_time);

        let id = TaskId(inner.next_task_id.get());
        inner.next_task_id.set(id.0 + 1);
        let task = Rc::new(Task {
            id,
            priority,
            start_time,
            expiration_time,
            sort_index: Cell::new(0),
            callback: RefCell::new(Some(Box::new(callback))),
            cancelled: Cell::new(false),
        });

        if start_time > current_time {
            task.sort_index.set(start_time);
            inner.timer_queue.borrow_mut().push(Rc::clone(&task));
            log::trace!("{id} ({priority}) delayed until {start_time}");

            let is_soonest_timer = inner
                .timer_queue
                .borrow()
                .peek()
                .is_some_and(|top| Rc::ptr_eq(top, &task));
            if inner.task_queue.borrow().is_empty() && is_soonest_timer {
                if inner.host_timeout.get().is_some() {
                    self.cancel_host_timeout();
                }
                self.arm_host_timeout(start_time, current_time);
            }
        } else {
            task.sort_index.set(expiration_time);
            inner.task_queue.borrow_mut().push(Rc::clone(&task));
            log::trace!("{id} ({priority}) ready, expires at {expiration_time}");

            if !inner.is_host_callback_scheduled.get() && !inner.is_performing_work.get() {
                inner.is_host_callback_scheduled.set(true);
                self.request_host_callback();
            }
        }

        TaskHandle { task }
    }

    /// Cancels a task. The entry stays in its heap until it reaches the top.
    pub fn cancel_callback(&self, handle: &TaskHandle) {
        handle.task.cancelled.set(true);
        handle.task.callback.borrow_mut().take();
        log::trace!("{} cancelled", handle.task.id);
    }

    pub fn current_priority_level(&self) -> Priority {
        self.inner.current_priority.get()
    }

    /// True once the current slice has used up its frame interval.
    pub fn should_yield_to_host(&self) -> bool {
        let elapsed = self
            .inner
            .clock
            .now()
            .saturating_sub(self.inner.slice_start.get());
        elapsed >= self.inner.config.frame_interval
    }

    /// Runs one slice of work. Called by the host in response to
    /// [`HostScheduler::request_host_callback`].
    ///
    /// Returns `true` when work remains; the scheduler has already asked the
    /// host for another callback in that case.
    pub fn perform_work_until_deadline(&self) -> bool {
        let inner = &self.inner;
        if !inner.is_message_loop_running.get() {
            return false;
        }
        let current_time = inner.clock.now();
        inner.slice_start.set(current_time);
        let has_more_work = self.flush_work(current_time);
        if has_more_work {
            inner.host.request_host_callback();
        } else {
            inner.is_message_loop_running.set(false);
        }
        has_more_work
    }

    /// Promotes due delayed tasks. Called by the host once the timeout it was
    /// given through [`HostScheduler::request_host_timeout`] elapses.
    pub fn handle_timeout(&self) {
        let inner = &self.inner;
        inner.host_timeout.set(None);
        let current_time = inner.clock.now();
        self.advance_timers(current_time);

        if inner.is_host_callback_scheduled.get() {
            return;
        }
        if !inner.task_queue.borrow().is_empty() {
            inner.is_host_callback_scheduled.set(true);
            self.request_host_callback();
            return;
        }
        let first_timer = inner.timer_queue.borrow().peek().map(|timer| timer.start_time);
        if let Some(start_time) = first_timer {
            self.arm_host_timeout(start_time, current_time);
        }
    }

    pub fn is_message_loop_running(&self) -> bool {
        self.inner.is_message_loop_running.get()
    }

    /// Absolute time at which the host should call [`Scheduler::handle_timeout`].
    pub fn host_timeout_deadline(&self) -> Option<Millis> {
        self.inner.host_timeout.get()
    }

    /// Entries in the ready heap, including cancelled ones not yet dropped.
    pub fn ready_len(&self) -> usize {
        self.inner.task_queue.borrow().len()
    }

    /// Entries in the delayed heap, including cancelled ones not yet dropped.
    pub fn delayed_len(&self) -> usize {
        self.inner.timer_queue.borrow().len()
    }

    pub fn has_pending_work(&self) -> bool {
        self.ready_len() > 0 || self.delayed_len() > 0
    }

    pub fn current_task_id(&self) -> Option<TaskId> {
        self.inner.current_task.borrow().as_ref().map(|task| task.id)
    }

    fn flush_work(&self, initial_time: Millis) -> bool {
        let inner = &self.inner;
        inner.is_host_callback_scheduled.set(false);
        if inner.host_timeout.get().is_some() {
            self.cancel_host_timeout();
        }
        inner.is_performing_work.set(true);
        let previous_priority = inner.current_priority.get();

        let has_more_work = self.work_loop(initial_time);

        inner.current_task.borrow_mut().take();
        inner.current_priority.set(previous_priority);
        inner.is_performing_work.set(false);
        has_more_work
    }

    fn work_loop(&self, initial_time: Millis) -> bool {
        let inner = &self.inner;
        let mut current_time = initial_time;
        self.advance_timers(current_time);

        loop {
            let Some(task) = inner.task_queue.borrow().peek().cloned() else {
                break;
            };
            if task.expiration_time > current_time && self.should_yield_to_host() {
                log::trace!("yielding to host before {}", task.id);
                *inner.current_task.borrow_mut() = Some(task);
                return true;
            }

            let callback = task.callback.borrow_mut().take();
            let Some(callback) = callback else {
                // Cancelled, or finished while a more urgent task sat on top.
                inner.task_queue.borrow_mut().pop();
                continue;
            };

            *inner.current_task.borrow_mut() = Some(Rc::clone(&task));
            inner.current_priority.set(task.priority);
            let did_timeout = task.expiration_time <= current_time;
            log::trace!("running {} (did_timeout: {did_timeout})", task.id);
            let context = TaskContext {
                scheduler: self,
                task: task.id,
                did_timeout,
            };
            let continuation = callback(&context);
            current_time = inner.clock.now();

            match continuation {
                Continuation::Resume(next) if !task.cancelled.get() => {
                    *task.callback.borrow_mut() = Some(next);
                    self.advance_timers(current_time);
                    return true;
                }
                _ => {
                    {
                        let mut queue = inner.task_queue.borrow_mut();
                        if queue.peek().is_some_and(|top| Rc::ptr_eq(top, &task)) {
                            queue.pop();
                        }
                    }
                    self.advance_timers(current_time);
                }
            }
        }

        let first_timer = inner.timer_queue.borrow().peek().map(|timer| timer.start_time);
        if let Some(start_time) = first_timer {
            self.arm_host_timeout(start_time, current_time);
        }
        false
    }

    fn advance_timers(&self, current_time: Millis) {
        let inner = &self.inner;
        loop {
            let mut timers = inner.timer_queue.borrow_mut();
            let Some(timer) = timers.peek() else {
                return;
            };
            if !timer.has_callback() {
                timers.pop();
            } else if timer.start_time <= current_time {
                if let Some(timer) = timers.pop() {
                    timer.sort_index.set(timer.expiration_time);
                    log::trace!("{} promoted to ready", timer.id);
                    inner.task_queue.borrow_mut().push(timer);
                }
            } else {
                return;
            }
        }
    }

    fn request_host_callback(&self) {
        let inner = &self.inner;
        if !inner.is_message_loop_running.get() {
            inner.is_message_loop_running.set(true);
            inner.host.request_host_callback();
        }
    }

    fn arm_host_timeout(&self, deadline: Millis, current_time: Millis) {
        self.inner.host_timeout.set(Some(deadline));
        self.inner
            .host
            .request_host_timeout(deadline.saturating_sub(current_time));
    }

    fn cancel_host_timeout(&self) {
        self.inner.host_timeout.set(None);
        self.inner.host.cancel_host_timeout();
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("config", &self.inner.config)
            .field("ready", &self.ready_len())
            .field("delayed", &self.delayed_len())
            .field("current_priority", &self.current_priority_level())
            .field("message_loop_running", &self.is_message_loop_running())
            .field("host_timeout", &self.host_timeout_deadline())
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/scheduler_tests.rs"]
mod tests;
