//! NativeScript root layout
//!
//! A stack of dynamically presented views layered above a fixed base
//! layout, each with enter/exit animations and an optional shared
//! shade cover.

mod options;
mod root_layout;

pub use options::{RootLayoutOptions, ShadeCoverOptions, TransitionPair};
pub use root_layout::{AnimationKind, RootLayout, ShadeFactory};

use ns_animation::AnimationError;

/// Errors surfaced through overlay operation futures
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum OverlayError {
    #[error("invalid {operation} view: not a displayable node")]
    InvalidView { operation: &'static str },

    #[error("view has already been added")]
    AlreadyOpen,

    #[error("unable to close popup: view not found")]
    NotOpen,

    #[error("view not found or already at topmost")]
    NotOpenOrTopmost,

    #[error("error playing {kind} animation: {source}")]
    Animation {
        kind: AnimationKind,
        source: AnimationError,
    },

    #[error(transparent)]
    Validation(#[from] ns_style::ValidationError),

    #[error(transparent)]
    View(#[from] ns_view::ViewError),
}
