//! Element properties, declared children and the diff recorded for host
//! updates.

use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::element::Element;

/// Attribute name that carries raw markup. A host element with this
/// attribute owns its content directly and produces no child nodes.
pub const INNER_HTML: &str = "innerHTML";

/// Event handler attached to a host element.
#[derive(Clone)]
pub struct Listener(Rc<dyn Fn()>);

impl Listener {
    pub fn new(handler: impl Fn() + 'static) -> Self {
        Self(Rc::new(handler))
    }

    pub fn call(&self) {
        (self.0)()
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener({:p})", Rc::as_ptr(&self.0) as *const ())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    Str(Rc<str>),
    Int(i64),
    Float(f64),
    Bool(bool),
    Listener(Listener),
}

impl PropValue {
    pub fn is_listener(&self) -> bool {
        matches!(self, PropValue::Listener(_))
    }
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Str(value) => f.write_str(value),
            PropValue::Int(value) => write!(f, "{value}"),
            PropValue::Float(value) => write!(f, "{value}"),
            PropValue::Bool(value) => write!(f, "{value}"),
            PropValue::Listener(_) => f.write_str("[listener]"),
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(Rc::from(value))
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(Rc::from(value))
    }
}

impl From<Rc<str>> for PropValue {
    fn from(value: Rc<str>) -> Self {
        PropValue::Str(value)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Int(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Int(value.into())
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Float(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<Listener> for PropValue {
    fn from(value: Listener) -> Self {
        PropValue::Listener(value)
    }
}

/// Declared children of an element.
///
/// Empty text is treated as no child. Nested lists become fragment nodes.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Children {
    #[default]
    Empty,
    Text(Rc<str>),
    Element(Element),
    List(Vec<Children>),
}

impl Children {
    pub fn text(value: impl fmt::Display) -> Self {
        let rendered = value.to_string();
        if rendered.is_empty() {
            Children::Empty
        } else {
            Children::Text(Rc::from(rendered))
        }
    }

    pub fn list(items: impl IntoIterator<Item = impl Into<Children>>) -> Self {
        Children::List(items.into_iter().map(Into::into).collect())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Children::Empty)
    }

    pub fn as_text(&self) -> Option<&Rc<str>> {
        match self {
            Children::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<Element> for Children {
    fn from(element: Element) -> Self {
        Children::Element(element)
    }
}

impl From<&str> for Children {
    fn from(value: &str) -> Self {
        Children::text(value)
    }
}

impl From<String> for Children {
    fn from(value: String) -> Self {
        Children::text(value)
    }
}

impl From<Rc<str>> for Children {
    fn from(value: Rc<str>) -> Self {
        if value.is_empty() {
            Children::Empty
        } else {
            Children::Text(value)
        }
    }
}

macro_rules! numeric_children {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Children {
                fn from(value: $ty) -> Self {
                    Children::text(value)
                }
            }
        )*
    };
}

numeric_children!(i32, i64, u32, u64, usize, f32, f64);

impl<T: Into<Children>> From<Vec<T>> for Children {
    fn from(items: Vec<T>) -> Self {
        Children::list(items)
    }
}

impl<T: Into<Children>> From<Option<T>> for Children {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

/// Attributes and children handed to an element.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Props {
    attributes: IndexMap<Cow<'static, str>, PropValue>,
    children: Children,
}

impl Props {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_children(children: impl Into<Children>) -> Self {
        Self {
            attributes: IndexMap::new(),
            children: children.into(),
        }
    }

    pub fn attr(mut self, name: impl Into<Cow<'static, str>>, value: impl Into<PropValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn listener(self, event: impl Into<Cow<'static, str>>, handler: impl Fn() + 'static) -> Self {
        self.attr(event, Listener::new(handler))
    }

    pub fn children(mut self, children: impl Into<Children>) -> Self {
        self.children = children.into();
        self
    }

    pub fn get(&self, name: &str) -> Option<&PropValue> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, &PropValue)> {
        self.attributes.iter().map(|(name, value)| (name.as_ref(), value))
    }

    pub fn child_nodes(&self) -> &Children {
        &self.children
    }

    /// Text owned directly by a host element, if its children are plain text.
    pub fn text_content(&self) -> Option<&Rc<str>> {
        self.children.as_text()
    }
}

/// Whether a host element renders its content itself instead of through
/// child nodes.
pub fn should_set_text_content(tag: &str, props: &Props) -> bool {
    tag == "textarea"
        || tag == "noscript"
        || props.text_content().is_some()
        || props.get(INNER_HTML).is_some()
}

/// A single change to a live host element.
#[derive(Debug, Clone, PartialEq)]
pub enum PropChange {
    Set {
        name: Cow<'static, str>,
        value: PropValue,
    },
    Remove {
        name: Cow<'static, str>,
    },
    AddListener {
        event: Cow<'static, str>,
        listener: Listener,
    },
    RemoveListener {
        event: Cow<'static, str>,
        listener: Listener,
    },
    /// Replace the element's text content. `None` clears it.
    TextContent(Option<Rc<str>>),
}

/// Changes computed during the render pass and applied at commit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropsDiff {
    changes: Vec<PropChange>,
}

impl PropsDiff {
    pub fn changes(&self) -> &[PropChange] {
        &self.changes
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }
}

/// Computes the changes that turn `prev` into `next`.
///
/// Removals come first, in `prev` order, followed by additions and
/// replacements in `next` order. Text content is diffed last.
pub fn diff_props(prev: &Props, next: &Props) -> PropsDiff {
    let mut changes = Vec::new();

    for (name, value) in &prev.attributes {
        if next.attributes.contains_key(name) {
            continue;
        }
        match value {
            PropValue::Listener(listener) => changes.push(PropChange::RemoveListener {
                event: name.clone(),
                listener: listener.clone(),
            }),
            _ => changes.push(PropChange::Remove { name: name.clone() }),
        }
    }

    for (name, value) in &next.attributes {
        let previous = prev.attributes.get(name);
        if previous == Some(value) {
            continue;
        }
        if let Some(PropValue::Listener(old)) = previous {
            changes.push(PropChange::RemoveListener {
                event: name.clone(),
                listener: old.clone(),
            });
        }
        match value {
            PropValue::Listener(listener) => changes.push(PropChange::AddListener {
                event: name.clone(),
                listener: listener.clone(),
            }),
            _ => changes.push(PropChange::Set {
                name: name.clone(),
                value: value.clone(),
            }),
        }
    }

    let prev_text = prev.text_content();
    let next_text = next.text_content();
    if prev_text != next_text {
        changes.push(PropChange::TextContent(next_text.cloned()));
    }

    PropsDiff { changes }
}

#[cfg(test)]
#[path = "tests/props_tests.rs"]
mod tests;
