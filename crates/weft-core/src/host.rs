use std::fmt;

use crate::props::{Props, PropsDiff};

/// Opaque handle to an instance owned by the host surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HostHandle(pub u64);

impl fmt::Display for HostHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Mutation interface of the rendering surface.
///
/// Instances are created during the render pass but only become visible
/// once the commit attaches them below a container. All other calls are made
/// from the commit pass.
pub trait HostSurface {
    /// Creates a detached element carrying its initial attributes and, for
    /// elements that own their text, its text content.
    fn create_element_instance(&mut self, tag: &str, props: &Props) -> HostHandle;

    fn create_text_instance(&mut self, text: &str) -> HostHandle;

    /// Appends `child` as the last child of `parent`, moving it if attached
    /// elsewhere.
    fn append_child(&mut self, parent: HostHandle, child: HostHandle);

    /// Inserts `child` right before `before`, moving it if attached elsewhere.
    fn insert_before(&mut self, parent: HostHandle, child: HostHandle, before: HostHandle);

    fn remove_child(&mut self, parent: HostHandle, child: HostHandle);

    fn apply_props_diff(&mut self, handle: HostHandle, diff: &PropsDiff);
}
