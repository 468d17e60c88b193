//! A reconciler wired to a [`RecordingHost`] and a manually driven scheduler.

use std::sync::Arc;

use weft_core::{Children, HostHandle, Reconciler, ReconcilerConfig, RootHandle};
use weft_scheduler::Scheduler;

use crate::clock::ManualClock;
use crate::driver::{run_slice, run_until_idle, test_scheduler};
use crate::host::{HostOp, RecordingHost};

pub struct TestRenderer {
    reconciler: Reconciler<RecordingHost>,
    clock: Arc<ManualClock>,
}

impl TestRenderer {
    pub fn new() -> Self {
        Self::with_config(ReconcilerConfig::default())
    }

    pub fn with_config(config: ReconcilerConfig) -> Self {
        let (scheduler, clock) = test_scheduler();
        let reconciler = Reconciler::with_config(RecordingHost::new(), scheduler, config);
        Self { reconciler, clock }
    }

    pub fn reconciler(&self) -> &Reconciler<RecordingHost> {
        &self.reconciler
    }

    pub fn scheduler(&self) -> &Scheduler {
        self.reconciler.scheduler()
    }

    /// Shared so that components can advance time while they render.
    pub fn clock(&self) -> &Arc<ManualClock> {
        &self.clock
    }

    /// Mounts `children` into the host's default container.
    pub fn mount(&self, children: impl Into<Children>) -> RootHandle {
        let container = self.reconciler.with_host(RecordingHost::container);
        self.reconciler.mount(container, children)
    }

    /// Mounts `children` into a fresh container of its own.
    pub fn mount_in_new_container(&self, children: impl Into<Children>) -> RootHandle {
        let container = self.reconciler.with_host_mut(RecordingHost::create_container);
        self.reconciler.mount(container, children)
    }

    pub fn run_slice(&self) -> bool {
        run_slice(self.scheduler())
    }

    pub fn run_until_idle(&self) -> usize {
        run_until_idle(self.scheduler(), &self.clock)
    }

    pub fn markup(&self, root: &RootHandle) -> String {
        self.reconciler
            .with_host(|host| host.to_markup(root.container()))
    }

    pub fn take_ops(&self) -> Vec<HostOp> {
        self.reconciler.with_host_mut(RecordingHost::take_ops)
    }

    pub fn children_of(&self, handle: HostHandle) -> Vec<HostHandle> {
        self.reconciler.with_host(|host| host.children_of(handle))
    }

    /// Fires `event` on `handle` and reports whether a listener was bound.
    pub fn dispatch_event(&self, handle: HostHandle, event: &str) -> bool {
        self.reconciler
            .with_host(|host| host.dispatch_event(handle, event))
    }
}

impl Default for TestRenderer {
    fn default() -> Self {
        Self::new()
    }
}
