//! NativeScript animation interface
//!
//! Declarative transition definitions plus the driver seam the platform
//! animation engine implements. The engine itself (easing math, frame
//! scheduling) lives behind [`AnimationDriver`]; this crate only composes
//! and awaits playback.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use futures::future::LocalBoxFuture;
use futures::FutureExt;
use ns_dom::NodeId;
use serde::{Deserialize, Serialize};

/// Animation failures, wrapping the underlying engine rejection
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnimationError {
    #[error("animation driver failure: {0}")]
    Driver(String),

    #[error("animation was cancelled")]
    Cancelled,
}

/// Easing curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Curve {
    #[default]
    EaseIn,
    EaseOut,
    EaseInOut,
    Linear,
    Spring,
}

/// Declarative transition state: the transform/opacity a view animates
/// from (enter) or to (exit), with duration and curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransitionAnimation {
    pub translate_x: f64,
    pub translate_y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub rotate: f64,
    pub opacity: f64,
    #[serde(rename = "duration")]
    pub duration_ms: u64,
    pub curve: Curve,
}

/// Identity transform, full opacity, 300ms ease-in
pub const DEFAULT_TRANSITION: TransitionAnimation = TransitionAnimation {
    translate_x: 0.0,
    translate_y: 0.0,
    scale_x: 1.0,
    scale_y: 1.0,
    rotate: 0.0,
    opacity: 1.0,
    duration_ms: 300,
    curve: Curve::EaseIn,
};

/// Shade covers fade by default: identity transform, opacity 0
pub const SHADE_COVER_TRANSITION: TransitionAnimation = TransitionAnimation {
    translate_x: 0.0,
    translate_y: 0.0,
    scale_x: 1.0,
    scale_y: 1.0,
    rotate: 0.0,
    opacity: 0.0,
    duration_ms: 300,
    curve: Curve::EaseIn,
};

impl Default for TransitionAnimation {
    fn default() -> Self {
        DEFAULT_TRANSITION
    }
}

impl TransitionAnimation {
    /// The runtime definition that moves `target` to this state.
    pub fn definition_for(&self, target: NodeId) -> AnimationDefinition {
        AnimationDefinition {
            target,
            translate: (self.translate_x, self.translate_y),
            scale: (self.scale_x, self.scale_y),
            rotate: self.rotate,
            opacity: self.opacity,
            duration: Duration::from_millis(self.duration_ms),
            curve: self.curve,
        }
    }
}

/// The declarative form handed to the animation engine
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationDefinition {
    pub target: NodeId,
    pub translate: (f64, f64),
    pub scale: (f64, f64),
    pub rotate: f64,
    pub opacity: f64,
    pub duration: Duration,
    pub curve: Curve,
}

/// Platform animation engine seam
pub trait AnimationDriver {
    /// Play one definition to completion.
    fn play(&self, definition: AnimationDefinition) -> LocalBoxFuture<'static, Result<(), AnimationError>>;

    /// Cancel any in-flight animation on the target.
    fn cancel(&self, target: NodeId);
}

/// A set of definitions played together against one driver
pub struct Animation {
    driver: Rc<dyn AnimationDriver>,
    definitions: Vec<AnimationDefinition>,
}

impl Animation {
    pub fn new(driver: Rc<dyn AnimationDriver>, definitions: Vec<AnimationDefinition>) -> Self {
        Self { driver, definitions }
    }

    pub fn definitions(&self) -> &[AnimationDefinition] {
        &self.definitions
    }

    /// Play every definition concurrently; the first failure wins.
    pub async fn play(&self) -> Result<(), AnimationError> {
        let plays = self
            .definitions
            .iter()
            .cloned()
            .map(|definition| self.driver.play(definition));
        futures::future::try_join_all(plays).await?;
        Ok(())
    }

    pub fn cancel(&self) {
        for definition in &self.definitions {
            self.driver.cancel(definition.target);
        }
    }
}

/// Driver that completes every play immediately. Deterministic playback
/// for tests and headless runs.
#[derive(Debug, Default)]
pub struct InstantDriver;

impl AnimationDriver for InstantDriver {
    fn play(&self, definition: AnimationDefinition) -> LocalBoxFuture<'static, Result<(), AnimationError>> {
        tracing::trace!(target = ?definition.target, "instant play");
        futures::future::ready(Ok(())).boxed_local()
    }

    fn cancel(&self, _target: NodeId) {}
}

/// Driver that records plays and cancellations, completing immediately.
#[derive(Default)]
pub struct RecordingDriver {
    played: RefCell<Vec<AnimationDefinition>>,
    cancelled: RefCell<Vec<NodeId>>,
}

impl RecordingDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn played(&self) -> Vec<AnimationDefinition> {
        self.played.borrow().clone()
    }

    pub fn cancelled(&self) -> Vec<NodeId> {
        self.cancelled.borrow().clone()
    }
}

impl AnimationDriver for RecordingDriver {
    fn play(&self, definition: AnimationDefinition) -> LocalBoxFuture<'static, Result<(), AnimationError>> {
        self.played.borrow_mut().push(definition);
        futures::future::ready(Ok(())).boxed_local()
    }

    fn cancel(&self, target: NodeId) {
        self.cancelled.borrow_mut().push(target);
    }
}
