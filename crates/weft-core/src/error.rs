use crate::node::{NodeId, NodeKind};
use crate::work_loop::Phase;

/// Invariant violations that abort a render or commit pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// A node's kind does not match the data it carries.
    UnexpectedNodeKind {
        node: NodeId,
        kind: NodeKind,
        phase: Phase,
    },
    /// A node id no longer refers to a live node.
    StaleNode { node: NodeId },
    /// No host element or root container above a node being placed.
    MissingHostParent { node: NodeId },
    UnknownRoot,
    /// A component called a different number of hooks than last render.
    HookCountMismatch {
        node: NodeId,
        expected: usize,
        found: usize,
    },
    /// The hook at `index` holds state of a different type.
    HookTypeMismatch { node: NodeId, index: usize },
    /// A synchronous flush was requested from inside a running pass.
    Reentrant,
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::UnexpectedNodeKind { node, kind, phase } => {
                write!(f, "unexpected {kind} node {node:?} during {phase}")
            }
            RenderError::StaleNode { node } => write!(f, "node {node:?} is no longer alive"),
            RenderError::MissingHostParent { node } => {
                write!(f, "node {node:?} has no host parent to attach to")
            }
            RenderError::UnknownRoot => f.write_str("root is not registered"),
            RenderError::HookCountMismatch {
                node,
                expected,
                found,
            } => write!(
                f,
                "node {node:?} rendered {found} hooks; expected {expected}"
            ),
            RenderError::HookTypeMismatch { node, index } => {
                write!(f, "hook {index} of node {node:?} changed its state type")
            }
            RenderError::Reentrant => f.write_str("flush requested while a pass is running"),
        }
    }
}

impl std::error::Error for RenderError {}
