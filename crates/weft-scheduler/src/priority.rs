use std::fmt;

use crate::Millis;

/// Priority levels understood by the scheduler, most urgent first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum Priority {
    /// No task is running.
    #[default]
    NoPriority,
    Immediate,
    UserBlocking,
    Normal,
    Low,
    Idle,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Priority::NoPriority => "none",
            Priority::Immediate => "immediate",
            Priority::UserBlocking => "user-blocking",
            Priority::Normal => "normal",
            Priority::Low => "low",
            Priority::Idle => "idle",
        };
        f.write_str(name)
    }
}

/// Effectively infinite: idle work never expires on its own.
pub const MAX_SIGNED_31_BIT_INT: Millis = 1_073_741_823;

/// Tuning knobs for a [`Scheduler`](crate::Scheduler).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// Length of one time slice. A task that has been running for this long
    /// is asked to yield.
    pub frame_interval: Millis,
    pub user_blocking_timeout: Millis,
    pub normal_timeout: Millis,
    pub low_timeout: Millis,
    pub idle_timeout: Millis,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            frame_interval: 5,
            user_blocking_timeout: 250,
            normal_timeout: 5_000,
            low_timeout: 10_000,
            idle_timeout: MAX_SIGNED_31_BIT_INT,
        }
    }
}

impl SchedulerConfig {
    /// Absolute expiration time for a task of `priority` starting at `start_time`.
    ///
    /// Immediate tasks expire one millisecond before they start, so they are
    /// always considered overdue and never yield.
    pub fn expiration_time(&self, priority: Priority, start_time: Millis) -> Millis {
        match priority {
            Priority::Immediate => start_time.saturating_sub(1),
            Priority::UserBlocking => start_time.saturating_add(self.user_blocking_timeout),
            Priority::Low => start_time.saturating_add(self.low_timeout),
            Priority::Idle => start_time.saturating_add(self.idle_timeout),
            Priority::Normal | Priority::NoPriority => {
                start_time.saturating_add(self.normal_timeout)
            }
        }
    }
}
