//! Child reconciliation: turns a node's declared children into its next child
//! chain, reusing previous buffers where identity allows.

use std::rc::Rc;

use crate::collections::map::HashMap;
use crate::element::{Element, ElementType};
use crate::error::RenderError;
use crate::node::{EffectFlags, NodeId, NodeKind, NodeTree};
use crate::props::{Children, Props};

/// Identity of a child within its parent's list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum ChildKey {
    Key(Rc<str>),
    Index(usize),
}

/// Reconciles `children` against the previous chain starting at
/// `current_first`, links the result under `parent` and returns the first new
/// child.
///
/// With `track_side_effects` off (the parent is mounting) no placement or
/// deletion is recorded: the whole subtree is attached when its host parent
/// completes.
pub(crate) fn reconcile_children(
    tree: &mut NodeTree,
    parent: NodeId,
    current_first: Option<NodeId>,
    children: &Children,
    track_side_effects: bool,
) -> Result<Option<NodeId>, RenderError> {
    let mut reconciler = ChildReconciler {
        tree,
        parent,
        track_side_effects,
    };
    let first = match children {
        Children::Empty => {
            reconciler.delete_remaining(current_first)?;
            None
        }
        Children::Text(text) => {
            reconciler.delete_remaining(current_first)?;
            let created = reconciler.create_text(text)?;
            Some(reconciler.place_single_child(created)?)
        }
        Children::Element(element) => {
            let child = reconciler.reconcile_single_element(current_first, element)?;
            Some(reconciler.place_single_child(child)?)
        }
        Children::List(items) => reconciler.reconcile_array(current_first, items)?,
    };
    reconciler.tree.get_mut(parent)?.child = first;
    Ok(first)
}

struct ChildReconciler<'a> {
    tree: &'a mut NodeTree,
    parent: NodeId,
    track_side_effects: bool,
}

impl ChildReconciler<'_> {
    fn adopt(&mut self, child: NodeId) -> Result<NodeId, RenderError> {
        self.tree.get_mut(child)?.parent = Some(self.parent);
        Ok(child)
    }

    fn create_text(&mut self, text: &Rc<str>) -> Result<NodeId, RenderError> {
        let created = self.tree.create_text(Rc::clone(text));
        self.adopt(created)
    }

    fn create_element(&mut self, element: &Element) -> Result<NodeId, RenderError> {
        let created = self.tree.create_from_element(element);
        self.adopt(created)
    }

    fn create_fragment(&mut self, items: &[Children]) -> Result<NodeId, RenderError> {
        let created = self.tree.create_fragment(items, None);
        self.adopt(created)
    }

    fn create_child(&mut self, child: &Children) -> Result<Option<NodeId>, RenderError> {
        Ok(match child {
            Children::Empty => None,
            Children::Text(text) => Some(self.create_text(text)?),
            Children::Element(element) => Some(self.create_element(element)?),
            Children::List(items) => Some(self.create_fragment(items)?),
        })
    }

    /// Reuses the other buffer of `current` for the new render.
    fn use_node(&mut self, current: NodeId, props: Rc<Props>) -> Result<NodeId, RenderError> {
        let wip = self.tree.create_work_in_progress(current, props)?;
        let node = self.tree.get_mut(wip)?;
        node.index = 0;
        node.sibling = None;
        self.adopt(wip)
    }

    fn delete_child(&mut self, child: NodeId) -> Result<(), RenderError> {
        if !self.track_side_effects {
            return Ok(());
        }
        let parent = self.tree.get_mut(self.parent)?;
        parent.deletions.push(child);
        parent.flags |= EffectFlags::CHILD_DELETION;
        Ok(())
    }

    fn delete_remaining(&mut self, first: Option<NodeId>) -> Result<(), RenderError> {
        if !self.track_side_effects {
            return Ok(());
        }
        let mut next = first;
        while let Some(child) = next {
            next = self.tree.get(child)?.sibling;
            self.delete_child(child)?;
        }
        Ok(())
    }

    fn place_single_child(&mut self, child: NodeId) -> Result<NodeId, RenderError> {
        let node = self.tree.get_mut(child)?;
        if self.track_side_effects && node.alternate.is_none() {
            node.flags |= EffectFlags::PLACEMENT;
        }
        Ok(child)
    }

    /// Records `child`'s position and flags it when it is new or has moved
    /// left of the last stable child. Returns the updated last placed index.
    fn place_child(
        &mut self,
        child: NodeId,
        last_placed_index: usize,
        new_index: usize,
    ) -> Result<usize, RenderError> {
        let current = self.tree.get(child)?.alternate;
        let old_index = match current {
            Some(current) => Some(self.tree.get(current)?.index),
            None => None,
        };
        let node = self.tree.get_mut(child)?;
        node.index = new_index;
        if !self.track_side_effects {
            return Ok(last_placed_index);
        }
        match old_index {
            Some(old_index) if old_index < last_placed_index => {
                node.flags |= EffectFlags::PLACEMENT;
                Ok(last_placed_index)
            }
            Some(old_index) => Ok(old_index),
            None => {
                node.flags |= EffectFlags::PLACEMENT;
                Ok(last_placed_index)
            }
        }
    }

    fn reconcile_single_element(
        &mut self,
        current_first: Option<NodeId>,
        element: &Element,
    ) -> Result<NodeId, RenderError> {
        let mut next = current_first;
        while let Some(child) = next {
            let node = self.tree.get(child)?;
            let sibling = node.sibling;
            if node.key.as_ref() == element.key() {
                if node.element_type.as_ref() == Some(element.element_type()) {
                    self.delete_remaining(sibling)?;
                    return self.use_node(child, Rc::clone(element.props()));
                }
                // Keys are unique among siblings: nothing further can match.
                self.delete_remaining(Some(child))?;
                break;
            }
            self.delete_child(child)?;
            next = sibling;
        }
        self.create_element(element)
    }

    fn update_element(
        &mut self,
        current: Option<NodeId>,
        element: &Element,
    ) -> Result<NodeId, RenderError> {
        if let Some(current) = current {
            if self.tree.get(current)?.element_type.as_ref() == Some(element.element_type()) {
                return self.use_node(current, Rc::clone(element.props()));
            }
        }
        self.create_element(element)
    }

    fn update_fragment(
        &mut self,
        current: Option<NodeId>,
        items: &[Children],
    ) -> Result<NodeId, RenderError> {
        if let Some(current) = current {
            let node = self.tree.get(current)?;
            if node.kind == NodeKind::Fragment
                && node.element_type == Some(ElementType::Fragment)
            {
                let props = Rc::new(Props::with_children(Children::List(items.to_vec())));
                return self.use_node(current, props);
            }
        }
        self.create_fragment(items)
    }

    /// Matches a new child against the old child in the same slot. `None`
    /// means the slot's identity differs and the linear pass must stop.
    fn update_slot(
        &mut self,
        old: Option<NodeId>,
        new_child: &Children,
    ) -> Result<Option<NodeId>, RenderError> {
        let old_key = match old {
            Some(old) => self.tree.get(old)?.key.clone(),
            None => None,
        };
        match new_child {
            Children::Empty => Ok(None),
            // Text is never reused; the old slot gets deleted by the caller.
            Children::Text(text) if old_key.is_none() => Ok(Some(self.create_text(text)?)),
            Children::Text(_) => Ok(None),
            Children::Element(element) if element.key() == old_key.as_ref() => {
                Ok(Some(self.update_element(old, element)?))
            }
            Children::Element(_) => Ok(None),
            Children::List(items) if old_key.is_none() => {
                Ok(Some(self.update_fragment(old, items)?))
            }
            Children::List(_) => Ok(None),
        }
    }

    fn update_from_map(
        &mut self,
        existing: &HashMap<ChildKey, NodeId>,
        new_index: usize,
        new_child: &Children,
    ) -> Result<Option<NodeId>, RenderError> {
        match new_child {
            Children::Empty => Ok(None),
            Children::Text(text) => Ok(Some(self.create_text(text)?)),
            Children::Element(element) => {
                let matched = existing.get(&new_child_key(new_child, new_index)).copied();
                Ok(Some(self.update_element(matched, element)?))
            }
            Children::List(items) => {
                let matched = existing.get(&ChildKey::Index(new_index)).copied();
                Ok(Some(self.update_fragment(matched, items)?))
            }
        }
    }

    fn old_child_key(&self, child: NodeId) -> Result<ChildKey, RenderError> {
        let node = self.tree.get(child)?;
        Ok(match &node.key {
            Some(key) => ChildKey::Key(Rc::clone(key)),
            None => ChildKey::Index(node.index),
        })
    }

    fn map_remaining(
        &self,
        first: Option<NodeId>,
    ) -> Result<HashMap<ChildKey, NodeId>, RenderError> {
        let mut existing = HashMap::default();
        let mut next = first;
        while let Some(child) = next {
            existing.insert(self.old_child_key(child)?, child);
            next = self.tree.get(child)?.sibling;
        }
        Ok(existing)
    }

    fn link(
        &mut self,
        first: &mut Option<NodeId>,
        previous: &mut Option<NodeId>,
        child: NodeId,
    ) -> Result<(), RenderError> {
        match *previous {
            Some(previous) => self.tree.get_mut(previous)?.sibling = Some(child),
            None => *first = Some(child),
        }
        *previous = Some(child);
        Ok(())
    }

    fn reconcile_array(
        &mut self,
        current_first: Option<NodeId>,
        items: &[Children],
    ) -> Result<Option<NodeId>, RenderError> {
        let mut first = None;
        let mut previous = None;
        let mut last_placed_index = 0;
        let mut new_index = 0;
        let mut old = current_first;

        // Walk both lists in step while identities line up.
        while let Some(old_child) = old {
            if new_index >= items.len() {
                break;
            }
            let (slot, next_old) = {
                let node = self.tree.get(old_child)?;
                if node.index > new_index {
                    (None, Some(old_child))
                } else {
                    (Some(old_child), node.sibling)
                }
            };
            let Some(new_child) = self.update_slot(slot, &items[new_index])? else {
                break;
            };
            if let Some(slot) = slot {
                if self.tree.get(new_child)?.alternate.is_none() {
                    self.delete_child(slot)?;
                }
            }
            last_placed_index = self.place_child(new_child, last_placed_index, new_index)?;
            self.link(&mut first, &mut previous, new_child)?;
            old = next_old;
            new_index += 1;
        }

        if new_index == items.len() {
            self.delete_remaining(old)?;
            return Ok(first);
        }

        if old.is_none() {
            for (index, item) in items.iter().enumerate().skip(new_index) {
                let Some(created) = self.create_child(item)? else {
                    continue;
                };
                last_placed_index = self.place_child(created, last_placed_index, index)?;
                self.link(&mut first, &mut previous, created)?;
            }
            return Ok(first);
        }

        // Out of step: match the rest by key, or by index for unkeyed children.
        let mut existing = self.map_remaining(old)?;
        for (index, item) in items.iter().enumerate().skip(new_index) {
            let Some(new_child) = self.update_from_map(&existing, index, item)? else {
                continue;
            };
            if self.track_side_effects && self.tree.get(new_child)?.alternate.is_some() {
                existing.remove(&new_child_key(item, index));
            }
            last_placed_index = self.place_child(new_child, last_placed_index, index)?;
            self.link(&mut first, &mut previous, new_child)?;
        }

        if self.track_side_effects {
            let mut next = old;
            while let Some(child) = next {
                next = self.tree.get(child)?.sibling;
                let key = self.old_child_key(child)?;
                if existing.get(&key) == Some(&child) {
                    self.delete_child(child)?;
                }
            }
        }

        Ok(first)
    }
}

fn new_child_key(child: &Children, index: usize) -> ChildKey {
    match child {
        Children::Element(element) => match element.key() {
            Some(key) => ChildKey::Key(Rc::clone(key)),
            None => ChildKey::Index(index),
        },
        _ => ChildKey::Index(index),
    }
}

#[cfg(test)]
#[path = "tests/reconcile_tests.rs"]
mod tests;
