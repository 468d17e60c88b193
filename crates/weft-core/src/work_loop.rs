//! Drives render passes: one unit of work per node, time sliced through the
//! scheduler, finished by a synchronous commit.

use std::fmt;
use std::rc::{Rc, Weak};

use weft_scheduler::{Callback, Continuation, ScheduleOptions, TaskContext};

use crate::begin::{begin_work, BeginContext};
use crate::commit;
use crate::complete::complete_work;
use crate::error::RenderError;
use crate::hooks::UpdateSink;
use crate::host::HostSurface;
use crate::node::{NodeId, RootId};
use crate::props::Children;
use crate::reconciler::ReconcilerInner;

/// Stage of the reconciler's single in-flight pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    #[default]
    Idle,
    Rendering,
    Committing,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Rendering => "render",
            Phase::Committing => "commit",
        };
        f.write_str(name)
    }
}

/// Synchronous flushes stop after this many back-to-back passes for one root,
/// which only happens when rendering keeps dispatching updates.
const NESTED_UPDATE_LIMIT: usize = 50;

enum StepOutcome {
    Yielded,
    Committed,
}

fn render_task<H: HostSurface + 'static>(
    reconciler: Weak<ReconcilerInner<H>>,
    root: RootId,
    target_epoch: u64,
) -> Callback {
    Box::new(move |ctx: &TaskContext<'_>| {
        let Some(inner) = reconciler.upgrade() else {
            return Continuation::Done;
        };
        inner.perform_concurrent_work_on_root(root, target_epoch, ctx)
    })
}

impl<H: HostSurface + 'static> ReconcilerInner<H> {
    /// Records a new update for `root` and schedules a task to render it.
    pub(crate) fn schedule_root(&self, root: RootId) -> Result<(), RenderError> {
        let target_epoch = {
            let mut roots = self.roots.borrow_mut();
            let entry = roots.get_mut(root).ok_or(RenderError::UnknownRoot)?;
            entry.update_epoch += 1;
            entry.update_epoch
        };
        let handle = self.scheduler.schedule_callback(
            self.config.update_priority,
            render_task(self.self_ref.clone(), root, target_epoch),
            ScheduleOptions::default(),
        );
        log::debug!(
            "scheduled render of {root:?} (update {target_epoch}) as {}",
            handle.id()
        );
        Ok(())
    }

    fn perform_concurrent_work_on_root(
        &self,
        root: RootId,
        target_epoch: u64,
        ctx: &TaskContext<'_>,
    ) -> Continuation {
        loop {
            if self.phase.get() == Phase::Idle {
                let committed = self
                    .roots
                    .borrow()
                    .get(root)
                    .map(|entry| entry.committed_epoch);
                match committed {
                    None => return Continuation::Done,
                    Some(committed) if committed >= target_epoch => return Continuation::Done,
                    Some(_) => {}
                }
                if !ctx.did_timeout() && ctx.should_yield() {
                    return Continuation::Resume(render_task(
                        self.self_ref.clone(),
                        root,
                        target_epoch,
                    ));
                }
                if let Err(error) = self.prepare_fresh_stack(root, target_epoch) {
                    self.abort_pass(Some(root), error, true);
                    return Continuation::Done;
                }
            }

            let in_flight = self.wip_root.get();
            match self.render_step(Some(ctx)) {
                Ok(StepOutcome::Yielded) => {
                    return Continuation::Resume(render_task(
                        self.self_ref.clone(),
                        root,
                        target_epoch,
                    ));
                }
                Ok(StepOutcome::Committed) => {}
                Err(error) => {
                    self.abort_pass(in_flight, error, true);
                    if in_flight == Some(root) {
                        return Continuation::Done;
                    }
                }
            }
        }
    }

    /// Renders and commits `root` without yielding, finishing any pass
    /// already in flight first.
    pub(crate) fn flush_sync(&self, root: RootId) -> Result<(), RenderError> {
        if self.is_working.get() {
            return Err(RenderError::Reentrant);
        }
        let mut passes = 0;
        loop {
            if self.phase.get() != Phase::Idle {
                let in_flight = self.wip_root.get();
                if let Err(error) = self.render_step(None) {
                    let ours = in_flight == Some(root);
                    self.abort_pass(in_flight, error.clone(), !ours);
                    if ours {
                        return Err(error);
                    }
                }
                continue;
            }

            let (update_epoch, committed_epoch) = self
                .roots
                .borrow()
                .get(root)
                .map(|entry| (entry.update_epoch, entry.committed_epoch))
                .ok_or(RenderError::UnknownRoot)?;
            if committed_epoch >= update_epoch {
                return Ok(());
            }
            if passes == NESTED_UPDATE_LIMIT {
                log::warn!("{root:?} is still updating after {passes} synchronous passes");
                return Ok(());
            }
            passes += 1;
            if let Err(error) = self.prepare_fresh_stack(root, update_epoch) {
                self.abort_pass(Some(root), error.clone(), false);
                return Err(error);
            }
        }
    }

    fn prepare_fresh_stack(&self, root: RootId, epoch: u64) -> Result<(), RenderError> {
        let (current, children) = self
            .roots
            .borrow()
            .get(root)
            .map(|entry| (entry.current, entry.element.clone()))
            .ok_or(RenderError::UnknownRoot)?;

        let wip = {
            let mut tree = self.tree.borrow_mut();
            tree.begin_pass();
            let props = Rc::clone(&tree.get(current)?.pending_props);
            let wip = tree.create_work_in_progress(current, props)?;
            tree.get_mut(wip)?.parent = None;
            wip
        };

        *self.wip_children.borrow_mut() = children;
        self.wip_root.set(Some(root));
        self.wip_root_node.set(Some(wip));
        self.work_in_progress.set(Some(wip));
        self.wip_epoch.set(epoch);
        self.phase.set(Phase::Rendering);
        log::debug!("starting render of {root:?} (update {epoch})");
        Ok(())
    }

    /// Runs units of work until the tree is done or the slice is used up.
    /// `ctx` is `None` for synchronous flushes.
    fn render_step(&self, ctx: Option<&TaskContext<'_>>) -> Result<StepOutcome, RenderError> {
        let root = self.wip_root.get().ok_or(RenderError::UnknownRoot)?;
        let time_slice = ctx.filter(|ctx| !ctx.did_timeout());
        let root_children: Children = self.wip_children.borrow().clone();
        let updater: Weak<dyn UpdateSink> = self.self_ref.clone();
        let cx = BeginContext {
            tree: &self.tree,
            root_children: &root_children,
            updater,
        };

        self.is_working.set(true);
        let result = self.work_loop(&cx, time_slice);
        self.is_working.set(false);

        match result? {
            true => {
                log::debug!("render of {root:?} yielded");
                Ok(StepOutcome::Yielded)
            }
            false => {
                self.is_working.set(true);
                let committed = self.commit(root);
                self.is_working.set(false);
                committed.map(|()| StepOutcome::Committed)
            }
        }
    }

    /// Returns `true` when it stopped to yield with work remaining.
    fn work_loop(
        &self,
        cx: &BeginContext<'_>,
        time_slice: Option<&TaskContext<'_>>,
    ) -> Result<bool, RenderError> {
        while let Some(unit) = self.work_in_progress.get() {
            if time_slice.is_some_and(|ctx| ctx.should_yield()) {
                return Ok(true);
            }
            self.perform_unit_of_work(cx, unit)?;
        }
        Ok(false)
    }

    fn perform_unit_of_work(&self, cx: &BeginContext<'_>, unit: NodeId) -> Result<(), RenderError> {
        log::trace!("begin {unit:?}");
        match begin_work(cx, unit)? {
            Some(child) => self.work_in_progress.set(Some(child)),
            None => self.complete_unit_of_work(unit)?,
        }
        Ok(())
    }

    fn complete_unit_of_work(&self, unit: NodeId) -> Result<(), RenderError> {
        let mut tree = self.tree.borrow_mut();
        let mut host = self.host.borrow_mut();
        let mut completed = unit;
        loop {
            log::trace!("complete {completed:?}");
            complete_work(&mut tree, &mut *host, completed)?;
            let node = tree.get(completed)?;
            if let Some(sibling) = node.sibling {
                self.work_in_progress.set(Some(sibling));
                return Ok(());
            }
            match node.parent {
                Some(parent) => completed = parent,
                None => {
                    self.work_in_progress.set(None);
                    return Ok(());
                }
            }
        }
    }

    fn commit(&self, root: RootId) -> Result<(), RenderError> {
        self.phase.set(Phase::Committing);
        let finished = self.wip_root_node.get().ok_or(RenderError::UnknownRoot)?;
        let container = {
            let mut roots = self.roots.borrow_mut();
            let entry = roots.get_mut(root).ok_or(RenderError::UnknownRoot)?;
            entry.finished_work = Some(finished);
            entry.container
        };

        {
            let mut tree = self.tree.borrow_mut();
            let mut host = self.host.borrow_mut();
            commit::validate(&tree, container, finished)?;
            commit::commit_root(&mut tree, &mut *host, container, finished)?;
            tree.finish_pass();
        }

        let epoch = self.wip_epoch.get();
        if let Some(entry) = self.roots.borrow_mut().get_mut(root) {
            entry.current = finished;
            entry.finished_work = None;
            entry.committed_epoch = entry.committed_epoch.max(epoch);
        }
        self.reset_work_state();
        log::debug!("committed {root:?} (update {epoch})");
        Ok(())
    }

    fn reset_work_state(&self) {
        self.work_in_progress.set(None);
        self.wip_root.set(None);
        self.wip_root_node.set(None);
        *self.wip_children.borrow_mut() = Children::Empty;
        self.phase.set(Phase::Idle);
    }

    /// Throws away the in-flight pass after an invariant violation.
    fn abort_pass(&self, root: Option<RootId>, error: RenderError, record: bool) {
        log::error!("render of {root:?} aborted: {error}");
        self.tree.borrow_mut().discard_pass();
        if let Some(root) = root {
            if let Some(entry) = self.roots.borrow_mut().get_mut(root) {
                entry.finished_work = None;
                if record {
                    entry.errors.push(error);
                }
            }
        }
        self.reset_work_state();
    }
}

impl<H: HostSurface + 'static> UpdateSink for ReconcilerInner<H> {
    fn schedule_update(&self, node: NodeId) {
        let idle = self.phase.get() == Phase::Idle && !self.is_working.get();
        let root = match self.tree.try_borrow_mut() {
            Ok(mut tree) => {
                if !tree.contains(node) {
                    log::warn!("dropping update for unmounted node {node:?}");
                    return;
                }
                if idle {
                    if let Err(error) = tree.ensure_alternate(node) {
                        log::warn!("dropping update for {node:?}: {error}");
                        return;
                    }
                }
                tree.root_of(node).or(self.wip_root.get())
            }
            Err(_) => self.wip_root.get(),
        };
        match root {
            Some(root) => {
                if let Err(error) = self.schedule_root(root) {
                    log::warn!("dropping update for {node:?}: {error}");
                }
            }
            None => log::warn!("dropping update for detached node {node:?}"),
        }
    }
}
