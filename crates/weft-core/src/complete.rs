//! Complete phase: builds host instances bottom-up and records updates.

use std::rc::Rc;

use crate::error::RenderError;
use crate::host::{HostHandle, HostSurface};
use crate::node::{EffectFlags, Instance, NodeId, NodeKind, NodeTree};
use crate::props::diff_props;
use crate::work_loop::Phase;

pub(crate) fn complete_work(
    tree: &mut NodeTree,
    host: &mut dyn HostSurface,
    wip: NodeId,
) -> Result<(), RenderError> {
    let node = tree.get(wip)?;
    let kind = node.kind;
    let unexpected = RenderError::UnexpectedNodeKind {
        node: wip,
        kind,
        phase: Phase::Rendering,
    };

    match kind {
        NodeKind::HostElement => {
            let tag = node.tag().cloned().ok_or(unexpected)?;
            let current = node.alternate.filter(|alternate| tree.contains(*alternate));
            let next_props = Rc::clone(&node.pending_props);

            match (current, node.instance.host()) {
                (Some(current), Some(_)) => {
                    let prev_props = tree.get(current)?.memoized_props.clone();
                    if let Some(prev_props) = prev_props {
                        if !Rc::ptr_eq(&prev_props, &next_props) {
                            let diff = diff_props(&prev_props, &next_props);
                            if !diff.is_empty() {
                                let node = tree.get_mut(wip)?;
                                node.update_payload = Some(diff);
                                node.flags |= EffectFlags::UPDATE;
                            }
                        }
                    }
                }
                _ => {
                    let handle = host.create_element_instance(&tag, &next_props);
                    append_all_children(tree, host, handle, wip)?;
                    tree.get_mut(wip)?.instance = Instance::Host(handle);
                }
            }
        }
        NodeKind::Text => {
            if node.instance.host().is_none() {
                let text = node.text().cloned().ok_or(unexpected)?;
                let handle = host.create_text_instance(&text);
                tree.get_mut(wip)?.instance = Instance::Host(handle);
            }
        }
        NodeKind::Root
        | NodeKind::Fragment
        | NodeKind::FunctionComponent
        | NodeKind::ClassComponent => {}
    }

    bubble_properties(tree, wip)
}

/// Appends the top-level host instances below `wip` to its new instance.
fn append_all_children(
    tree: &NodeTree,
    host: &mut dyn HostSurface,
    parent: HostHandle,
    wip: NodeId,
) -> Result<(), RenderError> {
    let mut next = tree.get(wip)?.child;
    while let Some(id) = next {
        let node = tree.get(id)?;
        if node.kind.is_host() {
            let child = node.instance.host().ok_or(RenderError::UnexpectedNodeKind {
                node: id,
                kind: node.kind,
                phase: Phase::Rendering,
            })?;
            host.append_child(parent, child);
        } else if let Some(child) = node.child {
            next = Some(child);
            continue;
        }

        let mut cursor = id;
        next = loop {
            let node = tree.get(cursor)?;
            if let Some(sibling) = node.sibling {
                break Some(sibling);
            }
            match node.parent {
                Some(parent) if parent != wip => cursor = parent,
                _ => break None,
            }
        };
    }
    Ok(())
}

fn bubble_properties(tree: &mut NodeTree, wip: NodeId) -> Result<(), RenderError> {
    let mut subtree_flags = EffectFlags::empty();
    let mut next = tree.get(wip)?.child;
    while let Some(child) = next {
        let node = tree.get(child)?;
        subtree_flags |= node.subtree_flags | node.flags;
        next = node.sibling;
    }
    tree.get_mut(wip)?.subtree_flags = subtree_flags;
    Ok(())
}
