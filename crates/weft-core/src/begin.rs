//! Begin phase: computes a node's next children, rendering components on the
//! way down.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::element::{Component, ElementType};
use crate::error::RenderError;
use crate::hooks::{HookChain, Hooks, UpdateSink};
use crate::node::{Instance, NodeId, NodeKind, NodeTree};
use crate::props::{should_set_text_content, Children};
use crate::reconcile::reconcile_children;
use crate::work_loop::Phase;

pub(crate) struct BeginContext<'a> {
    pub(crate) tree: &'a RefCell<NodeTree>,
    /// Pending subtree of the root being rendered.
    pub(crate) root_children: &'a Children,
    pub(crate) updater: Weak<dyn UpdateSink>,
}

/// Runs the begin phase for `wip` and returns the child to descend into.
///
/// Component code runs with the tree unborrowed, so it may dispatch state
/// updates or schedule work.
pub(crate) fn begin_work(
    cx: &BeginContext<'_>,
    wip: NodeId,
) -> Result<Option<NodeId>, RenderError> {
    let (kind, element_type, props, current) = {
        let tree = cx.tree.borrow();
        let node = tree.get(wip)?;
        let current = node.alternate.filter(|alternate| tree.contains(*alternate));
        (
            node.kind,
            node.element_type.clone(),
            Rc::clone(&node.pending_props),
            current,
        )
    };
    let unexpected = || RenderError::UnexpectedNodeKind {
        node: wip,
        kind,
        phase: Phase::Rendering,
    };

    let next_children = match kind {
        NodeKind::Root => Some(cx.root_children.clone()),
        NodeKind::HostElement => {
            let Some(ElementType::Host(tag)) = &element_type else {
                return Err(unexpected());
            };
            if should_set_text_content(tag, &props) {
                // Content lives on the element itself; drop any old child nodes.
                Some(Children::Empty)
            } else {
                Some(props.child_nodes().clone())
            }
        }
        NodeKind::Text => None,
        NodeKind::Fragment => Some(props.child_nodes().clone()),
        NodeKind::ClassComponent => {
            let Some(ElementType::Class(component)) = &element_type else {
                return Err(unexpected());
            };
            let instance: Rc<dyn Component> = Rc::from(component.construct(&props));
            let rendered = instance.render();
            cx.tree.borrow_mut().get_mut(wip)?.instance = Instance::Class(instance);
            Some(rendered)
        }
        NodeKind::FunctionComponent => {
            let Some(ElementType::Function(component)) = &element_type else {
                return Err(unexpected());
            };
            let (chain, mounting) = {
                let mut tree = cx.tree.borrow_mut();
                let node = tree.get_mut(wip)?;
                match &node.state {
                    Some(chain) => (Rc::clone(chain), false),
                    None => {
                        let chain = Rc::new(HookChain::default());
                        node.state = Some(Rc::clone(&chain));
                        (chain, true)
                    }
                }
            };
            let mut hooks = Hooks::new(wip, chain, mounting, cx.updater.clone());
            let rendered = component.render(&mut hooks, &props);
            hooks.finish()?;
            Some(rendered)
        }
    };

    let mut tree = cx.tree.borrow_mut();
    let next = match next_children {
        Some(children) => {
            let current_first = match current {
                Some(current) => tree.get(current)?.child,
                None => None,
            };
            reconcile_children(&mut tree, wip, current_first, &children, current.is_some())?
        }
        None => None,
    };
    tree.get_mut(wip)?.memoized_props = Some(props);
    Ok(next)
}
