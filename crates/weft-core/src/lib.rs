#![doc = r"Double-buffered node tree, reconciler and commit engine for Weft."]

mod begin;
pub mod collections;
mod commit;
mod complete;
pub mod element;
pub mod error;
pub mod hooks;
pub mod host;
pub mod node;
pub mod props;
mod reconcile;
pub mod reconciler;
pub mod work_loop;

pub use element::{ClassComponent, Component, Element, ElementType, FunctionComponent, RenderFn};
pub use error::RenderError;
pub use hooks::{Dispatch, Hooks};
pub use host::{HostHandle, HostSurface};
pub use node::{EffectFlags, NodeId, NodeInfo, NodeKind, RootId};
pub use props::{
    diff_props, should_set_text_content, Children, Listener, PropChange, PropValue, Props,
    PropsDiff, INNER_HTML,
};
pub use reconciler::{Reconciler, ReconcilerConfig, RootHandle};
pub use work_loop::Phase;

pub use weft_scheduler as scheduler;
