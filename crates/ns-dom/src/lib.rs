//! NativeScript DOM
//!
//! Lightweight DOM tree and event dispatch. The tree is the source of
//! truth that the view-synchronization layer projects onto native widgets.

mod event;
mod event_target;
mod node;
mod tree;

pub use event::{Event, EventInit};
pub use event_target::{AbortController, AbortSignal, EventTarget, ListenerId, ListenerOptions};
pub use node::{Attribute, ElementData, Node, NodeData, NodeType};
pub use tree::{ChildNodes, Tree};

/// Node identifier (index into the tree arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Raw arena index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Result type for DOM operations
pub type DomResult<T> = Result<T, StructureError>;

/// Tree invariant violations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StructureError {
    #[error("failed to execute 'insertBefore': the node before which the new node is to be inserted is not a child of this parent")]
    ReferenceNotChild,

    #[error("failed to execute 'replaceChild': the node to be replaced is not a child of this node")]
    ReplaceNonChild,

    #[error("failed to execute 'removeChild': the node to be removed is not a child of this node")]
    RemoveNonChild,

    #[error("failed to reorder: the node is not a child of this parent")]
    ReorderNonChild,
}
