//! In-memory host surface that records every mutation.

use std::fmt::Write as _;

use weft_core::{
    HostHandle, HostSurface, Listener, PropChange, PropValue, Props, PropsDiff, INNER_HTML,
};

/// One call made by the reconciler on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostOp {
    CreateElement { handle: HostHandle, tag: String },
    CreateText { handle: HostHandle, text: String },
    AppendChild { parent: HostHandle, child: HostHandle },
    InsertBefore { parent: HostHandle, child: HostHandle, before: HostHandle },
    RemoveChild { parent: HostHandle, child: HostHandle },
    ApplyDiff { handle: HostHandle, changes: usize },
}

#[derive(Debug)]
enum Content {
    Container,
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
        listeners: Vec<(String, Listener)>,
        text: Option<String>,
    },
    Text(String),
}

#[derive(Debug)]
struct HostNode {
    content: Content,
    parent: Option<HostHandle>,
    children: Vec<HostHandle>,
}

impl HostNode {
    fn new(content: Content) -> Self {
        Self {
            content,
            parent: None,
            children: Vec::new(),
        }
    }
}

/// Host surface backed by a flat list of nodes. Handles are list indices;
/// handle `#0` is the container created by [`RecordingHost::new`].
#[derive(Debug)]
pub struct RecordingHost {
    nodes: Vec<HostNode>,
    ops: Vec<HostOp>,
}

impl Default for RecordingHost {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingHost {
    pub fn new() -> Self {
        Self {
            nodes: vec![HostNode::new(Content::Container)],
            ops: Vec::new(),
        }
    }

    pub fn container(&self) -> HostHandle {
        HostHandle(0)
    }

    /// Adds another detached container, for tests with several roots.
    pub fn create_container(&mut self) -> HostHandle {
        self.push(Content::Container)
    }

    pub fn ops(&self) -> &[HostOp] {
        &self.ops
    }

    pub fn take_ops(&mut self) -> Vec<HostOp> {
        std::mem::take(&mut self.ops)
    }

    /// Number of instances created so far, containers included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn children_of(&self, handle: HostHandle) -> Vec<HostHandle> {
        self.node(handle)
            .map(|node| node.children.clone())
            .unwrap_or_default()
    }

    pub fn parent_of(&self, handle: HostHandle) -> Option<HostHandle> {
        self.node(handle)?.parent
    }

    pub fn tag_of(&self, handle: HostHandle) -> Option<&str> {
        match &self.node(handle)?.content {
            Content::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    pub fn attribute(&self, handle: HostHandle, name: &str) -> Option<&str> {
        match &self.node(handle)?.content {
            Content::Element { attributes, .. } => attributes
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }

    /// Calls the listener bound to `event` on `handle`. Returns `false` when
    /// none is bound.
    pub fn dispatch_event(&self, handle: HostHandle, event: &str) -> bool {
        let listener = match self.node(handle).map(|node| &node.content) {
            Some(Content::Element { listeners, .. }) => listeners
                .iter()
                .find(|(name, _)| name == event)
                .map(|(_, listener)| listener.clone()),
            _ => None,
        };
        match listener {
            Some(listener) => {
                listener.call();
                true
            }
            None => false,
        }
    }

    /// Markup of everything below `handle`, e.g. `<p id="x">hi</p>`.
    /// Containers render their children only.
    pub fn to_markup(&self, handle: HostHandle) -> String {
        let mut out = String::new();
        self.write_markup(handle, &mut out);
        out
    }

    fn write_markup(&self, handle: HostHandle, out: &mut String) {
        let Some(node) = self.node(handle) else {
            return;
        };
        match &node.content {
            Content::Container => {
                for child in &node.children {
                    self.write_markup(*child, out);
                }
            }
            Content::Text(text) => out.push_str(text),
            Content::Element {
                tag,
                attributes,
                text,
                ..
            } => {
                let _ = write!(out, "<{tag}");
                let mut inner_html = None;
                for (name, value) in attributes {
                    if name == INNER_HTML {
                        inner_html = Some(value);
                        continue;
                    }
                    let _ = write!(out, " {name}=\"{value}\"");
                }
                out.push('>');
                match (inner_html, text) {
                    (Some(html), _) => out.push_str(html),
                    (None, Some(text)) => out.push_str(text),
                    (None, None) => {
                        for child in &node.children {
                            self.write_markup(*child, out);
                        }
                    }
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }

    fn node(&self, handle: HostHandle) -> Option<&HostNode> {
        self.nodes.get(handle.0 as usize)
    }

    fn node_mut(&mut self, handle: HostHandle) -> Option<&mut HostNode> {
        self.nodes.get_mut(handle.0 as usize)
    }

    fn push(&mut self, content: Content) -> HostHandle {
        let handle = HostHandle(self.nodes.len() as u64);
        self.nodes.push(HostNode::new(content));
        handle
    }

    fn detach(&mut self, child: HostHandle) {
        let Some(parent) = self.node_mut(child).and_then(|node| node.parent.take()) else {
            return;
        };
        if let Some(parent) = self.node_mut(parent) {
            parent.children.retain(|existing| *existing != child);
        }
    }

    fn attach(&mut self, parent: HostHandle, child: HostHandle, before: Option<HostHandle>) {
        if self.node(parent).is_none() || self.node(child).is_none() {
            log::warn!("ignoring attach of {child} to unknown parent {parent}");
            return;
        }
        self.detach(child);
        if let Some(node) = self.node_mut(parent) {
            let position = before
                .and_then(|before| node.children.iter().position(|existing| *existing == before))
                .unwrap_or(node.children.len());
            node.children.insert(position, child);
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
        }
    }
}

impl HostSurface for RecordingHost {
    fn create_element_instance(&mut self, tag: &str, props: &Props) -> HostHandle {
        let mut attributes = Vec::new();
        let mut listeners = Vec::new();
        for (name, value) in props.attributes() {
            match value {
                PropValue::Listener(listener) => listeners.push((name.to_owned(), listener.clone())),
                other => attributes.push((name.to_owned(), other.to_string())),
            }
        }
        let text = props.text_content().map(|text| text.to_string());
        let handle = self.push(Content::Element {
            tag: tag.to_owned(),
            attributes,
            listeners,
            text,
        });
        self.ops.push(HostOp::CreateElement {
            handle,
            tag: tag.to_owned(),
        });
        handle
    }

    fn create_text_instance(&mut self, text: &str) -> HostHandle {
        let handle = self.push(Content::Text(text.to_owned()));
        self.ops.push(HostOp::CreateText {
            handle,
            text: text.to_owned(),
        });
        handle
    }

    fn append_child(&mut self, parent: HostHandle, child: HostHandle) {
        self.ops.push(HostOp::AppendChild { parent, child });
        self.attach(parent, child, None);
    }

    fn insert_before(&mut self, parent: HostHandle, child: HostHandle, before: HostHandle) {
        self.ops.push(HostOp::InsertBefore {
            parent,
            child,
            before,
        });
        self.attach(parent, child, Some(before));
    }

    fn remove_child(&mut self, parent: HostHandle, child: HostHandle) {
        self.ops.push(HostOp::RemoveChild { parent, child });
        if self.parent_of(child) == Some(parent) {
            self.detach(child);
        } else {
            log::warn!("{child} is not a child of {parent}");
        }
    }

    fn apply_props_diff(&mut self, handle: HostHandle, diff: &PropsDiff) {
        self.ops.push(HostOp::ApplyDiff {
            handle,
            changes: diff.len(),
        });
        let Some(HostNode {
            content:
                Content::Element {
                    attributes,
                    listeners,
                    text,
                    ..
                },
            ..
        }) = self.node_mut(handle)
        else {
            log::warn!("props diff for non-element {handle}");
            return;
        };
        for change in diff.changes() {
            match change {
                PropChange::Set { name, value } => {
                    let value = value.to_string();
                    match attributes.iter_mut().find(|(key, _)| key.as_str() == &**name) {
                        Some((_, existing)) => *existing = value,
                        None => attributes.push((name.to_string(), value)),
                    }
                }
                PropChange::Remove { name } => attributes.retain(|(key, _)| key.as_str() != &**name),
                PropChange::AddListener { event, listener } => {
                    listeners.push((event.to_string(), listener.clone()))
                }
                PropChange::RemoveListener { event, listener } => {
                    listeners.retain(|(name, bound)| !(name.as_str() == &**event && bound == listener))
                }
                PropChange::TextContent(next) => *text = next.as_ref().map(|t| t.to_string()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_before_moves_an_attached_child() {
        let mut host = RecordingHost::new();
        let root = host.container();
        let a = host.create_text_instance("a");
        let b = host.create_text_instance("b");
        host.append_child(root, a);
        host.append_child(root, b);

        host.insert_before(root, b, a);

        assert_eq!(host.children_of(root), vec![b, a]);
        assert_eq!(host.to_markup(root), "ba");
    }

    #[test]
    fn markup_renders_attributes_and_text() {
        let mut host = RecordingHost::new();
        let root = host.container();
        let p = host.create_element_instance("p", &Props::with_children("hi").attr("id", "x"));
        host.append_child(root, p);

        assert_eq!(host.to_markup(root), "<p id=\"x\">hi</p>");
    }

    #[test]
    fn diff_updates_attributes_and_listeners() {
        let mut host = RecordingHost::new();
        let button = host.create_element_instance(
            "button",
            &Props::new().attr("title", "old").listener("onClick", || {}),
        );
        let prev = Props::new().attr("title", "old");
        let next = Props::new().attr("title", "new").attr("disabled", true);

        host.apply_props_diff(button, &weft_core::diff_props(&prev, &next));

        assert_eq!(host.attribute(button, "title"), Some("new"));
        assert_eq!(host.attribute(button, "disabled"), Some("true"));
        assert!(host.dispatch_event(button, "onClick"));
        assert!(!host.dispatch_event(button, "onHover"));
    }
}
