#![doc = r"Cooperative, priority-ordered task scheduling for Weft."]

pub mod heap;
pub mod platform;
pub mod priority;
pub mod scheduler;

pub use heap::{HeapNode, MinHeap};
pub use platform::{Clock, DefaultHost, HostScheduler};
pub use priority::{Priority, SchedulerConfig, MAX_SIGNED_31_BIT_INT};
pub use scheduler::{
    Callback, Continuation, ScheduleOptions, Scheduler, TaskContext, TaskHandle, TaskId,
};

/// Milliseconds on the scheduler's clock.
pub type Millis = u64;
