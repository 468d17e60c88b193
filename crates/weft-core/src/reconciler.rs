//! Roots and the public render API.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use slotmap::SlotMap;
use weft_scheduler::{Priority, Scheduler};

use crate::element::Component;
use crate::error::RenderError;
use crate::host::{HostHandle, HostSurface};
use crate::node::{NodeId, NodeInfo, NodeTree, RootId};
use crate::props::Children;
use crate::work_loop::Phase;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Priority of the render task scheduled for each update.
    pub update_priority: Priority,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            update_priority: Priority::Normal,
        }
    }
}

/// A container registered with a reconciler.
#[derive(Debug)]
pub(crate) struct Root {
    pub(crate) container: HostHandle,
    /// Committed root node.
    pub(crate) current: NodeId,
    /// Subtree the next pass renders.
    pub(crate) element: Children,
    /// Finished tree while its commit runs.
    pub(crate) finished_work: Option<NodeId>,
    /// Bumped by every update. A pass renders everything up to the epoch it
    /// was started for.
    pub(crate) update_epoch: u64,
    pub(crate) committed_epoch: u64,
    pub(crate) errors: Vec<RenderError>,
}

pub(crate) struct ReconcilerInner<H: HostSurface + 'static> {
    pub(crate) scheduler: Scheduler,
    pub(crate) config: ReconcilerConfig,
    pub(crate) tree: RefCell<NodeTree>,
    pub(crate) host: RefCell<H>,
    pub(crate) roots: RefCell<SlotMap<RootId, Root>>,
    pub(crate) phase: Cell<Phase>,
    pub(crate) work_in_progress: Cell<Option<NodeId>>,
    pub(crate) wip_root: Cell<Option<RootId>>,
    pub(crate) wip_root_node: Cell<Option<NodeId>>,
    pub(crate) wip_epoch: Cell<u64>,
    pub(crate) wip_children: RefCell<Children>,
    /// Set while begin, complete or commit code is on the stack.
    pub(crate) is_working: Cell<bool>,
    pub(crate) self_ref: Weak<ReconcilerInner<H>>,
}

/// Handle to a root created by [`Reconciler::create_root`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RootHandle {
    id: RootId,
    container: HostHandle,
}

impl RootHandle {
    pub fn id(&self) -> RootId {
        self.id
    }

    pub fn container(&self) -> HostHandle {
        self.container
    }
}

/// Renders element trees into a [`HostSurface`], one time-sliced pass at a
/// time, using tasks on a shared [`Scheduler`].
///
/// Cloning yields another handle to the same reconciler.
pub struct Reconciler<H: HostSurface + 'static> {
    inner: Rc<ReconcilerInner<H>>,
}

impl<H: HostSurface + 'static> Clone for Reconciler<H> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<H: HostSurface + 'static> Reconciler<H> {
    pub fn new(host: H, scheduler: Scheduler) -> Self {
        Self::with_config(host, scheduler, ReconcilerConfig::default())
    }

    pub fn with_config(host: H, scheduler: Scheduler, config: ReconcilerConfig) -> Self {
        let inner = Rc::new_cyclic(|self_ref| ReconcilerInner {
            scheduler,
            config,
            tree: RefCell::new(NodeTree::new()),
            host: RefCell::new(host),
            roots: RefCell::new(SlotMap::with_key()),
            phase: Cell::new(Phase::Idle),
            work_in_progress: Cell::new(None),
            wip_root: Cell::new(None),
            wip_root_node: Cell::new(None),
            wip_epoch: Cell::new(0),
            wip_children: RefCell::new(Children::Empty),
            is_working: Cell::new(false),
            self_ref: self_ref.clone(),
        });
        Self { inner }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    pub fn config(&self) -> ReconcilerConfig {
        self.inner.config
    }

    /// Registers `container` as a root. Nothing renders until
    /// [`Reconciler::render`].
    pub fn create_root(&self, container: HostHandle) -> RootHandle {
        let mut tree = self.inner.tree.borrow_mut();
        let id = self.inner.roots.borrow_mut().insert_with_key(|id| Root {
            container,
            current: tree.create_root_node(id),
            element: Children::Empty,
            finished_work: None,
            update_epoch: 0,
            committed_epoch: 0,
            errors: Vec::new(),
        });
        log::debug!("created {id:?} in container {container}");
        RootHandle { id, container }
    }

    /// Creates a root for `container` and schedules the first render of
    /// `children` into it.
    pub fn mount(&self, container: HostHandle, children: impl Into<Children>) -> RootHandle {
        let root = self.create_root(container);
        if let Err(error) = self.render(&root, children) {
            log::warn!("initial render of {:?} not scheduled: {error}", root.id);
        }
        root
    }

    /// Replaces the root's subtree and schedules a render task for it.
    pub fn render(&self, root: &RootHandle, children: impl Into<Children>) -> Result<(), RenderError> {
        {
            let mut roots = self.inner.roots.borrow_mut();
            let entry = roots.get_mut(root.id).ok_or(RenderError::UnknownRoot)?;
            entry.element = children.into();
        }
        self.inner.schedule_root(root.id)
    }

    /// Schedules a render that removes everything below the container.
    pub fn unmount(&self, root: &RootHandle) -> Result<(), RenderError> {
        self.render(root, Children::Empty)
    }

    /// Renders and commits every update of `root` right away, without
    /// yielding to the scheduler.
    pub fn flush_sync(&self, root: &RootHandle) -> Result<(), RenderError> {
        self.inner.flush_sync(root.id)
    }

    /// Errors of scheduled passes for `root` since the last call.
    pub fn take_errors(&self, root: &RootHandle) -> Vec<RenderError> {
        self.inner
            .roots
            .borrow_mut()
            .get_mut(root.id)
            .map(|entry| std::mem::take(&mut entry.errors))
            .unwrap_or_default()
    }

    pub fn phase(&self) -> Phase {
        self.inner.phase.get()
    }

    /// True once every update of `root` has been committed.
    pub fn is_settled(&self, root: &RootHandle) -> bool {
        self.inner
            .roots
            .borrow()
            .get(root.id)
            .is_some_and(|entry| entry.committed_epoch >= entry.update_epoch)
    }

    pub fn committed_root(&self, root: &RootHandle) -> Option<NodeId> {
        self.inner.roots.borrow().get(root.id).map(|entry| entry.current)
    }

    /// First committed child of the root node.
    pub fn committed_root_child(&self, root: &RootHandle) -> Option<NodeId> {
        let current = self.committed_root(root)?;
        self.inner.tree.borrow().info(current)?.child
    }

    pub fn committed_children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner.tree.borrow().children(node)
    }

    pub fn node(&self, node: NodeId) -> Option<NodeInfo> {
        self.inner.tree.borrow().info(node)
    }

    /// Instance a class component node rendered through.
    pub fn class_instance(&self, node: NodeId) -> Option<Rc<dyn Component>> {
        let tree = self.inner.tree.borrow();
        tree.get(node).ok()?.instance.class().cloned()
    }

    /// Clone of the state stored in hook `index` of a function component.
    pub fn hook_state<S: Clone + 'static>(&self, node: NodeId, index: usize) -> Option<S> {
        let tree = self.inner.tree.borrow();
        let chain = tree.get(node).ok()?.state.clone()?;
        chain.state(index)
    }

    /// Number of live node buffers across all roots.
    pub fn node_count(&self) -> usize {
        self.inner.tree.borrow().len()
    }

    pub fn with_host<R>(&self, f: impl FnOnce(&H) -> R) -> R {
        f(&self.inner.host.borrow())
    }

    pub fn with_host_mut<R>(&self, f: impl FnOnce(&mut H) -> R) -> R {
        f(&mut self.inner.host.borrow_mut())
    }
}

impl<H: HostSurface + 'static> fmt::Debug for Reconciler<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("phase", &self.inner.phase.get())
            .field("roots", &self.inner.roots.borrow().len())
            .field("nodes", &self.inner.tree.borrow().len())
            .finish()
    }
}
