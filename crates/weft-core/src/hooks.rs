//! Per-component state cells addressed by call order.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use crate::error::RenderError;
use crate::node::NodeId;

/// Receives state changes that need a new render pass.
pub(crate) trait UpdateSink {
    fn schedule_update(&self, node: NodeId);
}

pub(crate) struct HookCell {
    state: RefCell<Box<dyn Any>>,
}

impl HookCell {
    fn new<S: 'static>(state: S) -> Self {
        Self {
            state: RefCell::new(Box::new(state)),
        }
    }

    fn get<S: Clone + 'static>(&self) -> Option<S> {
        self.state.borrow().downcast_ref::<S>().cloned()
    }
}

/// Ordered hook cells of one component, shared by both of its buffers.
#[derive(Default)]
pub(crate) struct HookChain {
    cells: RefCell<Vec<Rc<HookCell>>>,
}

impl HookChain {
    pub(crate) fn len(&self) -> usize {
        self.cells.borrow().len()
    }

    fn cell(&self, index: usize) -> Option<Rc<HookCell>> {
        self.cells.borrow().get(index).cloned()
    }

    fn push(&self, cell: Rc<HookCell>) {
        self.cells.borrow_mut().push(cell);
    }

    pub(crate) fn state<S: Clone + 'static>(&self, index: usize) -> Option<S> {
        self.cell(index)?.get()
    }
}

impl fmt::Debug for HookChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookChain")
            .field("len", &self.len())
            .finish()
    }
}

/// Hook context handed to a function component while it renders.
///
/// Hooks must be called in the same order and number on every render.
/// A component that breaks this fails its render pass.
pub struct Hooks {
    node: NodeId,
    chain: Rc<HookChain>,
    /// Cell count from the previous render. `None` while mounting.
    expected: Option<usize>,
    cursor: usize,
    updater: Weak<dyn UpdateSink>,
    error: Option<RenderError>,
}

impl Hooks {
    pub(crate) fn new(
        node: NodeId,
        chain: Rc<HookChain>,
        mounting: bool,
        updater: Weak<dyn UpdateSink>,
    ) -> Self {
        let expected = if mounting { None } else { Some(chain.len()) };
        Self {
            node,
            chain,
            expected,
            cursor: 0,
            updater,
            error: None,
        }
    }

    pub fn is_mounting(&self) -> bool {
        self.expected.is_none()
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Reducer-driven state. Dispatching an action runs `reducer` on the
    /// stored state and schedules a render of the owning root.
    pub fn use_reducer<S, A>(
        &mut self,
        reducer: impl Fn(&S, A) -> S + 'static,
        initial: S,
    ) -> (S, Dispatch<A>)
    where
        S: Clone + 'static,
        A: 'static,
    {
        self.use_reducer_with_init(reducer, initial, |state| state)
    }

    /// Like [`Hooks::use_reducer`], computing the first state lazily as
    /// `init(initial_arg)`.
    pub fn use_reducer_with_init<S, I, A>(
        &mut self,
        reducer: impl Fn(&S, A) -> S + 'static,
        initial_arg: I,
        init: impl FnOnce(I) -> S,
    ) -> (S, Dispatch<A>)
    where
        S: Clone + 'static,
        A: 'static,
    {
        let index = self.cursor;
        self.cursor += 1;

        let existing = match self.expected {
            Some(_) => self.chain.cell(index),
            None => None,
        };
        let (cell, value) = match existing.and_then(|cell| cell.get::<S>().map(|v| (cell, v))) {
            Some(found) => found,
            None => {
                if self.expected.is_some_and(|expected| index < expected) {
                    self.record(RenderError::HookTypeMismatch {
                        node: self.node,
                        index,
                    });
                }
                let value = init(initial_arg);
                let cell = Rc::new(HookCell::new(value.clone()));
                if self.is_mounting() {
                    self.chain.push(Rc::clone(&cell));
                }
                (cell, value)
            }
        };

        let dispatch = Dispatch::new(cell, Rc::new(reducer), self.node, self.updater.clone());
        (value, dispatch)
    }

    /// State replaced wholesale by each dispatched value.
    pub fn use_state<S>(&mut self, initial: S) -> (S, Dispatch<S>)
    where
        S: Clone + 'static,
    {
        self.use_reducer(|_: &S, next: S| next, initial)
    }

    fn record(&mut self, error: RenderError) {
        if self.error.is_none() {
            self.error = Some(error);
        }
    }

    /// Ends the render, checking the hook count against the previous one.
    pub(crate) fn finish(self) -> Result<(), RenderError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        match self.expected {
            Some(expected) if expected != self.cursor => Err(RenderError::HookCountMismatch {
                node: self.node,
                expected,
                found: self.cursor,
            }),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("node", &self.node)
            .field("cursor", &self.cursor)
            .field("mounting", &self.is_mounting())
            .finish()
    }
}

/// Sends actions to a reducer hook.
pub struct Dispatch<A> {
    apply: Rc<dyn Fn(A)>,
}

impl<A: 'static> Dispatch<A> {
    fn new<S: 'static>(
        cell: Rc<HookCell>,
        reducer: Rc<dyn Fn(&S, A) -> S>,
        node: NodeId,
        updater: Weak<dyn UpdateSink>,
    ) -> Self {
        let apply = move |action: A| {
            let next = {
                let state = cell.state.borrow();
                let Some(current) = state.downcast_ref::<S>() else {
                    log::warn!("dropping action for hook of {node:?}: state type changed");
                    return;
                };
                reducer(current, action)
            };
            *cell.state.borrow_mut() = Box::new(next);
            match updater.upgrade() {
                Some(sink) => sink.schedule_update(node),
                None => log::debug!("state of {node:?} updated after its reconciler was dropped"),
            }
        };
        Self {
            apply: Rc::new(apply),
        }
    }
}

impl<A> Dispatch<A> {
    /// Applies `action` now and schedules a render of the owning root.
    pub fn dispatch(&self, action: A) {
        (self.apply)(action)
    }
}

impl<A> Clone for Dispatch<A> {
    fn clone(&self) -> Self {
        Self {
            apply: Rc::clone(&self.apply),
        }
    }
}

impl<A> fmt::Debug for Dispatch<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Dispatch(..)")
    }
}

#[cfg(test)]
#[path = "tests/hooks_tests.rs"]
mod tests;
