//! Commit: applies the effects recorded on a finished tree to the host in one
//! uninterrupted pass.
//!
//! [`validate`] runs first and rejects trees the commit could only apply
//! partially, so [`commit_root`] never stops halfway through.

use crate::error::RenderError;
use crate::host::{HostHandle, HostSurface};
use crate::node::{EffectFlags, NodeId, NodeKind, NodeTree};
use crate::work_loop::Phase;

struct CommitContext<'a> {
    tree: &'a mut NodeTree,
    host: &'a mut dyn HostSurface,
    container: HostHandle,
}

/// Checks that every pending mutation below `finished` has a host target.
pub(crate) fn validate(
    tree: &NodeTree,
    container: HostHandle,
    finished: NodeId,
) -> Result<(), RenderError> {
    let mut stack = vec![finished];
    while let Some(id) = stack.pop() {
        let node = tree.get(id)?;

        for deleted in &node.deletions {
            tree.get(*deleted)?;
            host_parent(tree, container, id, *deleted)?;
        }
        if node.flags.contains(EffectFlags::PLACEMENT) {
            let parent = node
                .parent
                .ok_or(RenderError::MissingHostParent { node: id })?;
            host_parent(tree, container, parent, id)?;
            if node.kind.is_host() && node.instance.host().is_none() {
                return Err(RenderError::UnexpectedNodeKind {
                    node: id,
                    kind: node.kind,
                    phase: Phase::Committing,
                });
            }
        }
        if node.flags.contains(EffectFlags::UPDATE)
            && (node.instance.host().is_none() || node.update_payload.is_none())
        {
            return Err(RenderError::UnexpectedNodeKind {
                node: id,
                kind: node.kind,
                phase: Phase::Committing,
            });
        }

        if node.subtree_flags.intersects(EffectFlags::MUTATION_MASK) {
            stack.extend(tree.children(id));
        }
    }
    Ok(())
}

/// Applies every mutation recorded below `finished`, clearing flags as it goes.
pub(crate) fn commit_root(
    tree: &mut NodeTree,
    host: &mut dyn HostSurface,
    container: HostHandle,
    finished: NodeId,
) -> Result<(), RenderError> {
    let mut cx = CommitContext {
        tree,
        host,
        container,
    };
    commit_mutation_effects(&mut cx, finished)
}

fn commit_mutation_effects(cx: &mut CommitContext<'_>, id: NodeId) -> Result<(), RenderError> {
    let deletions = std::mem::take(&mut cx.tree.get_mut(id)?.deletions);
    for deleted in deletions {
        commit_deletion(cx, id, deleted)?;
    }

    // Own content first, so a cleared text content cannot wipe children
    // inserted below.
    let (flags, subtree_flags) = {
        let node = cx.tree.get(id)?;
        (node.flags, node.subtree_flags)
    };
    if flags.contains(EffectFlags::UPDATE) {
        commit_update(cx, id)?;
    }

    if subtree_flags.intersects(EffectFlags::MUTATION_MASK) {
        for child in cx.tree.children(id) {
            commit_mutation_effects(cx, child)?;
        }
    }

    if flags.contains(EffectFlags::PLACEMENT) {
        commit_placement(cx, id)?;
    }

    let node = cx.tree.get_mut(id)?;
    node.flags.remove(EffectFlags::MUTATION_MASK);
    node.subtree_flags = EffectFlags::empty();
    Ok(())
}

fn commit_update(cx: &mut CommitContext<'_>, id: NodeId) -> Result<(), RenderError> {
    let node = cx.tree.get_mut(id)?;
    let handle = node.instance.host();
    let payload = node.update_payload.take();
    if let (Some(handle), Some(diff)) = (handle, payload) {
        cx.host.apply_props_diff(handle, &diff);
    }
    Ok(())
}

fn commit_deletion(
    cx: &mut CommitContext<'_>,
    parent: NodeId,
    deleted: NodeId,
) -> Result<(), RenderError> {
    let host_parent = host_parent(cx.tree, cx.container, parent, deleted)?;
    let mut top_level = Vec::new();
    collect_top_level_host_nodes(cx.tree, deleted, &mut top_level)?;
    for child in top_level {
        cx.host.remove_child(host_parent, child);
    }
    log::trace!("deleted subtree {deleted:?}");
    cx.tree.free_subtree(deleted);
    Ok(())
}

fn commit_placement(cx: &mut CommitContext<'_>, id: NodeId) -> Result<(), RenderError> {
    let parent = cx
        .tree
        .get(id)?
        .parent
        .ok_or(RenderError::MissingHostParent { node: id })?;
    let host_parent = host_parent(cx.tree, cx.container, parent, id)?;
    let before = host_sibling(cx.tree, id)?;

    let mut top_level = Vec::new();
    collect_top_level_host_nodes(cx.tree, id, &mut top_level)?;
    for child in top_level {
        match before {
            Some(before) => cx.host.insert_before(host_parent, child, before),
            None => cx.host.append_child(host_parent, child),
        }
    }
    Ok(())
}

/// Host instance that receives the host output of `origin`: the nearest
/// host element at or above `start`, or the root's container.
fn host_parent(
    tree: &NodeTree,
    container: HostHandle,
    start: NodeId,
    origin: NodeId,
) -> Result<HostHandle, RenderError> {
    let mut next = Some(start);
    while let Some(id) = next {
        let node = tree.get(id)?;
        match node.kind {
            NodeKind::HostElement => {
                return node
                    .instance
                    .host()
                    .ok_or(RenderError::MissingHostParent { node: origin });
            }
            NodeKind::Root => return Ok(container),
            _ => next = node.parent,
        }
    }
    Err(RenderError::MissingHostParent { node: origin })
}

/// First host instance after `id` in host order that is already in place.
fn host_sibling(tree: &NodeTree, id: NodeId) -> Result<Option<HostHandle>, RenderError> {
    let mut node = id;
    'siblings: loop {
        let sibling = loop {
            let current = tree.get(node)?;
            if let Some(sibling) = current.sibling {
                break sibling;
            }
            let Some(parent) = current.parent else {
                return Ok(None);
            };
            if matches!(tree.get(parent)?.kind, NodeKind::HostElement | NodeKind::Root) {
                return Ok(None);
            }
            node = parent;
        };
        node = sibling;

        loop {
            let current = tree.get(node)?;
            if current.kind.is_host() {
                break;
            }
            if current.flags.contains(EffectFlags::PLACEMENT) {
                continue 'siblings;
            }
            match current.child {
                Some(child) => node = child,
                None => continue 'siblings,
            }
        }

        let current = tree.get(node)?;
        if !current.flags.contains(EffectFlags::PLACEMENT) {
            return Ok(current.instance.host());
        }
    }
}

/// Host nodes at or below `id` that are not nested inside another host node.
fn collect_top_level_host_nodes(
    tree: &NodeTree,
    id: NodeId,
    out: &mut Vec<HostHandle>,
) -> Result<(), RenderError> {
    let node = tree.get(id)?;
    if node.kind.is_host() {
        if let Some(handle) = node.instance.host() {
            out.push(handle);
        }
        return Ok(());
    }
    let mut next = node.child;
    while let Some(child) = next {
        collect_top_level_host_nodes(tree, child, out)?;
        next = tree.get(child)?.sibling;
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/commit_tests.rs"]
mod tests;
