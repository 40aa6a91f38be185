//! NativeScript view synchronization layer
//!
//! Bridges the generic DOM tree to native widget lifecycle: attach/detach,
//! suspended property application, style-scope inheritance, and
//! connected/disconnected callbacks.

mod hooks;
mod registry;
pub mod suspend;
mod view_tree;

pub use hooks::{
    LayoutScheduler, NativeHandle, NativeViewHooks, PlaceholderHooks, RenderContext, SharedHooks,
};
pub use registry::{ViewFactory, ViewRegistry};
pub use suspend::SuspendReason;
pub use view_tree::{ViewState, ViewTree};

/// Invalid call sequences
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("child is already connected to another parent")]
    AlreadyConnected,

    #[error("invalid call to resume native updates")]
    InvalidResume,
}

/// Errors surfaced by view-tree operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ViewError {
    #[error(transparent)]
    Structure(#[from] ns_dom::StructureError),

    #[error(transparent)]
    State(#[from] StateError),
}
