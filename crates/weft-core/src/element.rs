//! Element descriptors: the immutable input of a render pass.

use std::fmt;
use std::rc::Rc;

use crate::hooks::Hooks;
use crate::props::{Children, Props};

/// Render function of a function component.
pub type RenderFn = dyn Fn(&mut Hooks, &Props) -> Children;

/// A component defined by a render closure. Identity is the shared closure:
/// clones of one definition are the same component type.
#[derive(Clone)]
pub struct FunctionComponent {
    name: Rc<str>,
    render: Rc<RenderFn>,
}

impl FunctionComponent {
    pub fn new(
        name: impl Into<Rc<str>>,
        render: impl Fn(&mut Hooks, &Props) -> Children + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            render: Rc::new(render),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn element(&self, props: Props) -> Element {
        Element::new(ElementType::Function(self.clone()), props)
    }

    pub(crate) fn render(&self, hooks: &mut Hooks, props: &Props) -> Children {
        (self.render)(hooks, props)
    }
}

impl PartialEq for FunctionComponent {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.render, &other.render)
    }
}

impl fmt::Debug for FunctionComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FunctionComponent").field(&self.name).finish()
    }
}

/// Instance of a class component. A fresh instance is constructed every
/// time its node is rendered.
pub trait Component {
    fn render(&self) -> Children;
}

type Constructor = dyn Fn(&Props) -> Box<dyn Component>;

/// A component defined by a constructor producing a [`Component`] instance.
#[derive(Clone)]
pub struct ClassComponent {
    name: Rc<str>,
    construct: Rc<Constructor>,
}

impl ClassComponent {
    pub fn new(
        name: impl Into<Rc<str>>,
        construct: impl Fn(&Props) -> Box<dyn Component> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            construct: Rc::new(construct),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn element(&self, props: Props) -> Element {
        Element::new(ElementType::Class(self.clone()), props)
    }

    pub(crate) fn construct(&self, props: &Props) -> Box<dyn Component> {
        (self.construct)(props)
    }
}

impl PartialEq for ClassComponent {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.construct, &other.construct)
    }
}

impl fmt::Debug for ClassComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClassComponent").field(&self.name).finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElementType {
    Host(Rc<str>),
    Fragment,
    Function(FunctionComponent),
    Class(ClassComponent),
}

impl ElementType {
    /// Tag for host elements, component name otherwise.
    pub fn name(&self) -> &str {
        match self {
            ElementType::Host(tag) => tag,
            ElementType::Fragment => "#fragment",
            ElementType::Function(component) => component.name(),
            ElementType::Class(component) => component.name(),
        }
    }
}

/// Immutable description of one piece of the desired tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    element_type: ElementType,
    key: Option<Rc<str>>,
    props: Rc<Props>,
}

impl Element {
    pub fn new(element_type: ElementType, props: Props) -> Self {
        Self {
            element_type,
            key: None,
            props: Rc::new(props),
        }
    }

    pub fn host(tag: impl Into<Rc<str>>, props: Props) -> Self {
        Self::new(ElementType::Host(tag.into()), props)
    }

    pub fn fragment(children: impl Into<Children>) -> Self {
        Self::new(ElementType::Fragment, Props::with_children(children))
    }

    pub fn with_key(mut self, key: impl Into<Rc<str>>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn element_type(&self) -> &ElementType {
        &self.element_type
    }

    pub fn key(&self) -> Option<&Rc<str>> {
        self.key.as_ref()
    }

    pub fn props(&self) -> &Rc<Props> {
        &self.props
    }
}
