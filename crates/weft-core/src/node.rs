//! The double-buffered node tree.
//!
//! Every logical position in the tree owns at most two [`Node`] buffers: the
//! committed one and the one being rendered. They point at each other through
//! `alternate` and trade places on every commit. Nodes live in a generational
//! arena so ids that outlive their node are detected instead of aliasing.

use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;
use slotmap::SlotMap;

use crate::element::{Component, Element, ElementType};
use crate::error::RenderError;
use crate::hooks::HookChain;
use crate::host::HostHandle;
use crate::props::{Children, Props, PropsDiff};

slotmap::new_key_type! {
    /// Arena id of one node buffer.
    pub struct NodeId;
    /// Id of a registered root.
    pub struct RootId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Root,
    HostElement,
    Text,
    Fragment,
    FunctionComponent,
    ClassComponent,
}

impl NodeKind {
    fn for_element(element_type: &ElementType) -> Self {
        match element_type {
            ElementType::Host(_) => NodeKind::HostElement,
            ElementType::Fragment => NodeKind::Fragment,
            ElementType::Function(_) => NodeKind::FunctionComponent,
            ElementType::Class(_) => NodeKind::ClassComponent,
        }
    }

    /// Kinds that own a host instance of their own.
    pub fn is_host(self) -> bool {
        matches!(self, NodeKind::HostElement | NodeKind::Text)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Root => "root",
            NodeKind::HostElement => "host-element",
            NodeKind::Text => "text",
            NodeKind::Fragment => "fragment",
            NodeKind::FunctionComponent => "function-component",
            NodeKind::ClassComponent => "class-component",
        };
        f.write_str(name)
    }
}

bitflags! {
    /// Side effects a node carries into commit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct EffectFlags: u8 {
        /// Insert (or move) the node's host output.
        const PLACEMENT = 1 << 0;
        /// Apply the recorded props diff to the live host element.
        const UPDATE = 1 << 1;
        /// One or more previous children must be removed.
        const CHILD_DELETION = 1 << 2;

        const MUTATION_MASK = Self::PLACEMENT.bits()
            | Self::UPDATE.bits()
            | Self::CHILD_DELETION.bits();
    }
}

/// What a node's instance slot holds.
#[derive(Clone, Default)]
pub(crate) enum Instance {
    #[default]
    None,
    Host(HostHandle),
    Class(Rc<dyn Component>),
    Root(RootId),
}

impl Instance {
    pub(crate) fn class(&self) -> Option<&Rc<dyn Component>> {
        match self {
            Instance::Class(instance) => Some(instance),
            _ => None,
        }
    }

    pub(crate) fn host(&self) -> Option<HostHandle> {
        match self {
            Instance::Host(handle) => Some(*handle),
            _ => None,
        }
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instance::None => f.write_str("None"),
            Instance::Host(handle) => write!(f, "Host({handle:?})"),
            Instance::Class(_) => f.write_str("Class(..)"),
            Instance::Root(root) => write!(f, "Root({root:?})"),
        }
    }
}

#[derive(Debug)]
pub(crate) struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) key: Option<Rc<str>>,
    pub(crate) element_type: Option<ElementType>,
    pub(crate) instance: Instance,
    pub(crate) parent: Option<NodeId>,
    pub(crate) child: Option<NodeId>,
    pub(crate) sibling: Option<NodeId>,
    pub(crate) index: usize,
    pub(crate) pending_props: Rc<Props>,
    pub(crate) memoized_props: Option<Rc<Props>>,
    pub(crate) state: Option<Rc<HookChain>>,
    pub(crate) flags: EffectFlags,
    pub(crate) subtree_flags: EffectFlags,
    pub(crate) deletions: Vec<NodeId>,
    pub(crate) update_payload: Option<PropsDiff>,
    pub(crate) alternate: Option<NodeId>,
}

impl Node {
    fn new(
        kind: NodeKind,
        element_type: Option<ElementType>,
        key: Option<Rc<str>>,
        pending_props: Rc<Props>,
    ) -> Self {
        Self {
            kind,
            key,
            element_type,
            instance: Instance::None,
            parent: None,
            child: None,
            sibling: None,
            index: 0,
            pending_props,
            memoized_props: None,
            state: None,
            flags: EffectFlags::empty(),
            subtree_flags: EffectFlags::empty(),
            deletions: Vec::new(),
            update_payload: None,
            alternate: None,
        }
    }

    pub(crate) fn text(&self) -> Option<&Rc<str>> {
        match self.kind {
            NodeKind::Text => self.pending_props.text_content(),
            _ => None,
        }
    }

    pub(crate) fn tag(&self) -> Option<&Rc<str>> {
        match &self.element_type {
            Some(ElementType::Host(tag)) => Some(tag),
            _ => None,
        }
    }
}

/// Read-only snapshot of a node for inspection and tests.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeInfo {
    pub id: NodeId,
    pub kind: NodeKind,
    pub key: Option<Rc<str>>,
    /// Host tag or component name.
    pub name: Option<String>,
    pub text: Option<Rc<str>>,
    pub host: Option<HostHandle>,
    pub parent: Option<NodeId>,
    pub child: Option<NodeId>,
    pub sibling: Option<NodeId>,
    pub index: usize,
    pub alternate: Option<NodeId>,
    pub flags: EffectFlags,
    pub subtree_flags: EffectFlags,
    pub hook_count: usize,
}

/// Arena owning every node buffer of every root.
#[derive(Debug, Default)]
pub(crate) struct NodeTree {
    nodes: SlotMap<NodeId, Node>,
    created_in_pass: Vec<NodeId>,
}

impl NodeTree {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub(crate) fn get(&self, id: NodeId) -> Result<&Node, RenderError> {
        self.nodes.get(id).ok_or(RenderError::StaleNode { node: id })
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Result<&mut Node, RenderError> {
        self.nodes
            .get_mut(id)
            .ok_or(RenderError::StaleNode { node: id })
    }

    fn insert(&mut self, node: Node) -> NodeId {
        let id = self.nodes.insert(node);
        self.created_in_pass.push(id);
        id
    }

    /// Root nodes are created outside any render pass and are never discarded.
    pub(crate) fn create_root_node(&mut self, root: RootId) -> NodeId {
        let mut node = Node::new(NodeKind::Root, None, None, Rc::new(Props::new()));
        node.instance = Instance::Root(root);
        self.nodes.insert(node)
    }

    pub(crate) fn create_from_element(&mut self, element: &Element) -> NodeId {
        let element_type = element.element_type().clone();
        let kind = NodeKind::for_element(&element_type);
        self.insert(Node::new(
            kind,
            Some(element_type),
            element.key().cloned(),
            Rc::clone(element.props()),
        ))
    }

    pub(crate) fn create_text(&mut self, text: Rc<str>) -> NodeId {
        let props = Props::with_children(Children::Text(text));
        self.insert(Node::new(NodeKind::Text, None, None, Rc::new(props)))
    }

    /// Fragment standing in for a nested child list.
    pub(crate) fn create_fragment(&mut self, children: &[Children], key: Option<Rc<str>>) -> NodeId {
        let props = Props::with_children(Children::List(children.to_vec()));
        self.insert(Node::new(
            NodeKind::Fragment,
            Some(ElementType::Fragment),
            key,
            Rc::new(props),
        ))
    }

    /// Returns the in-progress buffer paired with `current`, reusing the
    /// alternate when one exists.
    pub(crate) fn create_work_in_progress(
        &mut self,
        current: NodeId,
        pending_props: Rc<Props>,
    ) -> Result<NodeId, RenderError> {
        let existing = self
            .get(current)?
            .alternate
            .filter(|alternate| self.nodes.contains_key(*alternate));

        let wip = match existing {
            Some(wip) => {
                let node = self.get_mut(wip)?;
                node.pending_props = pending_props;
                node.flags = EffectFlags::empty();
                node.subtree_flags = EffectFlags::empty();
                node.deletions.clear();
                node.update_payload = None;
                wip
            }
            None => {
                let source = self.get(current)?;
                let mut node = Node::new(
                    source.kind,
                    source.element_type.clone(),
                    source.key.clone(),
                    pending_props,
                );
                node.alternate = Some(current);
                let wip = self.insert(node);
                self.get_mut(current)?.alternate = Some(wip);
                wip
            }
        };

        let source = self.get(current)?;
        let child = source.child;
        let sibling = source.sibling;
        let index = source.index;
        let memoized_props = source.memoized_props.clone();
        let state = source.state.clone();
        let instance = source.instance.clone();

        let node = self.get_mut(wip)?;
        node.child = child;
        node.sibling = sibling;
        node.index = index;
        node.memoized_props = memoized_props;
        node.state = state;
        node.instance = instance;
        Ok(wip)
    }

    /// Makes sure a committed node has a second buffer, cloning it if needed.
    pub(crate) fn ensure_alternate(&mut self, id: NodeId) -> Result<NodeId, RenderError> {
        let node = self.get(id)?;
        if let Some(alternate) = node.alternate.filter(|alt| self.nodes.contains_key(*alt)) {
            return Ok(alternate);
        }
        let parent = node.parent;
        let props = Rc::clone(&node.pending_props);
        let alternate = self.create_work_in_progress(id, props)?;
        self.get_mut(alternate)?.parent = parent;
        Ok(alternate)
    }

    /// Walks parent links up to the root node and returns its root id.
    pub(crate) fn root_of(&self, id: NodeId) -> Option<RootId> {
        let mut current = id;
        loop {
            let node = self.nodes.get(current)?;
            match node.parent {
                Some(parent) => current = parent,
                None => {
                    return match node.instance {
                        Instance::Root(root) if node.kind == NodeKind::Root => Some(root),
                        _ => None,
                    }
                }
            }
        }
    }

    pub(crate) fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut next = self.nodes.get(id).and_then(|node| node.child);
        while let Some(child) = next {
            out.push(child);
            next = self.nodes.get(child).and_then(|node| node.sibling);
        }
        out
    }

    /// Frees a deleted subtree, both buffers of every position in it.
    pub(crate) fn free_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            let Some(node) = self.nodes.remove(next) else {
                continue;
            };
            if let Some(alternate) = node.alternate {
                if self
                    .nodes
                    .get(alternate)
                    .is_some_and(|alt| alt.alternate == Some(next))
                {
                    self.nodes.remove(alternate);
                }
            }
            let mut child = node.child;
            while let Some(current) = child {
                stack.push(current);
                child = self.nodes.get(current).and_then(|node| node.sibling);
            }
        }
    }

    pub(crate) fn begin_pass(&mut self) {
        self.created_in_pass.clear();
    }

    /// Frees every node allocated by an aborted pass.
    pub(crate) fn discard_pass(&mut self) {
        for id in std::mem::take(&mut self.created_in_pass) {
            self.nodes.remove(id);
        }
    }

    pub(crate) fn finish_pass(&mut self) {
        self.created_in_pass.clear();
    }

    pub(crate) fn info(&self, id: NodeId) -> Option<NodeInfo> {
        let node = self.nodes.get(id)?;
        Some(NodeInfo {
            id,
            kind: node.kind,
            key: node.key.clone(),
            name: node
                .element_type
                .as_ref()
                .map(|element_type| element_type.name().to_owned()),
            text: node.text().cloned(),
            host: node.instance.host(),
            parent: node.parent,
            child: node.child,
            sibling: node.sibling,
            index: node.index,
            alternate: node.alternate.filter(|alt| self.nodes.contains_key(*alt)),
            flags: node.flags,
            subtree_flags: node.subtree_flags,
            hook_count: node.state.as_ref().map_or(0, |chain| chain.len()),
        })
    }
}

#[cfg(test)]
#[path = "tests/node_tests.rs"]
mod tests;
