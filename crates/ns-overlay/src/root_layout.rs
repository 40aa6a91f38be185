//! Root layout: popup stack and shade cover
//!
//! Stack mutation is synchronous and happens before any animation starts,
//! so the authoritative stack state is always consistent with pending
//! operations even though visual effects lag behind. The single shade
//! cover is created lazily by the first popup that asks for one and closed
//! by the last.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use futures::future::{try_join, try_join_all};
use futures_lite::future::yield_now;
use ns_animation::{
    Animation, AnimationDriver, TransitionAnimation, DEFAULT_TRANSITION, SHADE_COVER_TRANSITION,
};
use ns_dom::{Event, NodeId};
use ns_style::PropertyValue;
use ns_view::ViewTree;

use crate::{OverlayError, RootLayoutOptions, ShadeCoverOptions};

/// Which animation of a view is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimationKind {
    Enter,
    Exit,
    Shade,
}

impl fmt::Display for AnimationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnimationKind::Enter => write!(f, "enter"),
            AnimationKind::Exit => write!(f, "exit"),
            AnimationKind::Shade => write!(f, "shade cover"),
        }
    }
}

/// Builds the shade cover view when one is first requested
pub type ShadeFactory = Box<dyn Fn(&mut ViewTree) -> NodeId>;

#[derive(Debug, Clone)]
struct PopupRecord {
    view: NodeId,
    options: RootLayoutOptions,
}

enum ShadeAction {
    Keep,
    Restore(ShadeCoverOptions),
    Close(Option<ShadeCoverOptions>),
}

/// Overlay manager for one root view
pub struct RootLayout {
    tree: Rc<RefCell<ViewTree>>,
    root: NodeId,
    /// Children present before any popup; popups stack above them
    static_child_count: usize,
    popup_views: RefCell<Vec<PopupRecord>>,
    shade_cover: Cell<Option<NodeId>>,
    shade_tap_to_close: Cell<bool>,
    driver: Rc<dyn AnimationDriver>,
    shade_factory: ShadeFactory,
    /// In-flight animation tokens per (view, kind); a new entry cancels
    /// the prior one
    active_animations: RefCell<HashMap<(NodeId, AnimationKind), u64>>,
    next_animation_token: Cell<u64>,
}

impl RootLayout {
    pub fn new(
        tree: Rc<RefCell<ViewTree>>,
        root: NodeId,
        driver: Rc<dyn AnimationDriver>,
        shade_factory: ShadeFactory,
    ) -> Self {
        let static_child_count = tree.borrow().dom().child_count(root);
        Self {
            tree,
            root,
            static_child_count,
            popup_views: RefCell::new(Vec::new()),
            shade_cover: Cell::new(None),
            shade_tap_to_close: Cell::new(false),
            driver,
            shade_factory,
            active_animations: RefCell::new(HashMap::new()),
            next_animation_token: Cell::new(0),
        }
    }

    /// Present a view above the static content.
    ///
    /// Resolves once the shade-cover transition and the enter animation
    /// have both completed; the two run concurrently. Note: two `open`
    /// calls issued without awaiting the first may both decide to create
    /// the shade cover — callers serialize opens that request one.
    pub async fn open(&self, view: NodeId, options: RootLayoutOptions) -> Result<(), OverlayError> {
        if !self.tree.borrow().is_view(view) {
            return Err(OverlayError::InvalidView { operation: "open" });
        }
        if self.popup_index(view).is_some() {
            return Err(OverlayError::AlreadyOpen);
        }

        tracing::debug!(?view, "open popup");
        let enter_from = options.animation.as_ref().and_then(|a| a.enter_from);
        let shade_options = options.shade_cover.clone();

        self.popup_views.borrow_mut().push(PopupRecord { view, options });

        // Always begin invisible when adding dynamically.
        {
            let mut tree = self.tree.borrow_mut();
            tree.set_style_property(view, "opacity", PropertyValue::number(0.0))?;
            tree.append_child(self.root, view)?;
        }

        let shade_branch = async {
            match shade_options {
                // One layer of shade cover is enough; later popups only
                // update its properties.
                Some(shade) if self.shade_cover.get().is_some() => {
                    self.update_shade_cover(shade).await
                }
                Some(shade) => self.open_shade_cover(shade).await,
                None => Ok(()),
            }
        };

        let enter_branch = async {
            // Apply the from-state after the next tick so safe areas and
            // other measurements settle first.
            yield_now().await;
            self.apply_transition_state(view, &enter_from.unwrap_or(DEFAULT_TRANSITION))?;
            let animation = self.enter_animation(view, enter_from.as_ref());
            self.play_tracked(AnimationKind::Enter, view, animation).await?;
            self.apply_transition_state(view, &DEFAULT_TRANSITION)?;
            self.notify(view, "opened");
            Ok(())
        };

        try_join(shade_branch, enter_branch).await?;
        Ok(())
    }

    /// Dismiss an open popup, playing its exit animation and adjusting the
    /// shade cover concurrently.
    pub async fn close(&self, view: NodeId) -> Result<(), OverlayError> {
        self.close_with(view, None).await
    }

    /// [`close`](Self::close) with an exit animation override.
    pub async fn close_with(
        &self,
        view: NodeId,
        exit_override: Option<TransitionAnimation>,
    ) -> Result<(), OverlayError> {
        if !self.tree.borrow().is_view(view) {
            return Err(OverlayError::InvalidView { operation: "close" });
        }
        let Some(index) = self.popup_index(view) else {
            return Err(OverlayError::NotOpen);
        };

        tracing::debug!(?view, "close popup");

        // Remove the record first; a concurrent open/close never observes
        // a transient inconsistent stack.
        let popped = self.popup_views.borrow_mut().remove(index);
        let exit_to =
            exit_override.or_else(|| popped.options.animation.as_ref().and_then(|a| a.exit_to));

        // Decide the shade adjustment against the stack as it is now.
        let shade_action = if self.shade_cover.get().is_none() {
            ShadeAction::Keep
        } else if self.popup_views.borrow().is_empty() {
            ShadeAction::Close(popped.options.shade_cover.clone())
        } else if popped
            .options
            .shade_cover
            .as_ref()
            .is_some_and(|s| s.ignore_shade_restore)
        {
            ShadeAction::Keep
        } else if let Some(next) = self
            .popup_views
            .borrow()
            .last()
            .and_then(|r| r.options.shade_cover.clone())
        {
            ShadeAction::Restore(next)
        } else {
            ShadeAction::Keep
        };

        let exit_branch = async {
            if let Some(exit_to) = exit_to {
                let animation = self.exit_animation(view, &exit_to);
                self.play_tracked(AnimationKind::Exit, view, animation).await?;
            }
            Ok(())
        };

        let shade_branch = async {
            match shade_action {
                ShadeAction::Keep => Ok(()),
                ShadeAction::Restore(options) => self.update_shade_cover(options).await,
                ShadeAction::Close(options) => self.close_shade_cover(options).await,
            }
        };

        try_join(exit_branch, shade_branch).await?;

        self.prune_animations(view);
        self.notify(view, "closed");
        self.tree.borrow_mut().remove_child(self.root, view)?;
        Ok(())
    }

    /// Close every open popup concurrently.
    pub async fn close_all(&self) -> Result<(), OverlayError> {
        let views: Vec<NodeId> = self.popup_views.borrow().iter().map(|r| r.view).collect();
        try_join_all(views.into_iter().map(|view| self.close(view))).await?;
        Ok(())
    }

    /// Reorder an open popup to the visual front.
    ///
    /// Rejects when the view is not open or already topmost. With
    /// `animated`, replays the view's exit transform and then its enter
    /// transition; the native view is reordered regardless.
    pub async fn bring_to_front(&self, view: NodeId, animated: bool) -> Result<(), OverlayError> {
        if !self.tree.borrow().is_view(view) {
            return Err(OverlayError::InvalidView {
                operation: "bringToFront",
            });
        }
        let Some(index) = self.popup_index(view) else {
            return Err(OverlayError::NotOpenOrTopmost);
        };
        if index + 1 == self.popup_views.borrow().len() {
            return Err(OverlayError::NotOpenOrTopmost);
        }

        // Keep the stack in sync with the visual reorder before animating.
        let (enter_from, exit_to, shade_options) = {
            let mut popups = self.popup_views.borrow_mut();
            let record = popups.remove(index);
            let enter_from = record.options.animation.as_ref().and_then(|a| a.enter_from);
            let exit_to = record.options.animation.as_ref().and_then(|a| a.exit_to);
            let shade_options = record.options.shade_cover.clone();
            popups.push(record);
            (enter_from, exit_to, shade_options)
        };

        match (animated, exit_to) {
            (true, Some(exit_to)) => {
                let exit = self.exit_animation(view, &exit_to);
                match self.play_tracked(AnimationKind::Exit, view, exit).await {
                    Ok(()) => {
                        self.reorder_native_to_front(view)?;
                        if let Some(enter_from) = enter_from {
                            self.apply_transition_state(view, &enter_from)?;
                            let enter = self.enter_animation(view, Some(&enter_from));
                            self.play_tracked(AnimationKind::Enter, view, enter).await?;
                        }
                        self.apply_transition_state(view, &DEFAULT_TRANSITION)?;
                    }
                    Err(err) => {
                        // Reorder regardless; the failure still rejects
                        // the operation.
                        self.reorder_native_to_front(view)?;
                        return Err(err);
                    }
                }
            }
            _ => self.reorder_native_to_front(view)?,
        }

        if let Some(shade_options) = shade_options {
            if self.shade_cover.get().is_some() {
                self.update_shade_cover(shade_options).await?;
            }
        }
        Ok(())
    }

    /// The last stack entry's view, if any popup is open.
    pub fn topmost(&self) -> Option<NodeId> {
        self.popup_views.borrow().last().map(|r| r.view)
    }

    pub fn is_open(&self, view: NodeId) -> bool {
        self.popup_index(view).is_some()
    }

    pub fn popup_count(&self) -> usize {
        self.popup_views.borrow().len()
    }

    pub fn get_shade_cover(&self) -> Option<NodeId> {
        self.shade_cover.get()
    }

    /// Gesture-glue entry: a tap landed on the shade cover.
    pub async fn handle_shade_tap(&self) -> Result<(), OverlayError> {
        if self.shade_tap_to_close.get() {
            self.close_all().await?;
        }
        Ok(())
    }

    /// Livesync reload: close everything; reports whether anything was
    /// handled.
    pub async fn on_livesync(&self) -> Result<bool, OverlayError> {
        if self.popup_views.borrow().is_empty() {
            return Ok(false);
        }
        self.close_all().await?;
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Shade cover
    // ------------------------------------------------------------------

    async fn open_shade_cover(&self, options: ShadeCoverOptions) -> Result<(), OverlayError> {
        if self.shade_cover.get().is_some() {
            tracing::warn!("root layout shade cover already open");
            return Ok(());
        }

        let shade = {
            let mut tree = self.tree.borrow_mut();
            let shade = (self.shade_factory)(&mut tree);
            tree.set_style_property(shade, "vertical-alignment", PropertyValue::text("bottom"))?;
            tree.set_style_property(shade, "opacity", PropertyValue::number(0.0))?;
            // Right above the static content, below every popup.
            let reference = tree.dom().child_nodes(self.root).nth(self.static_child_count);
            tree.insert_before(self.root, shade, reference)?;
            shade
        };
        self.shade_cover.set(Some(shade));
        self.update_shade_cover(options).await
    }

    async fn update_shade_cover(&self, options: ShadeCoverOptions) -> Result<(), OverlayError> {
        let Some(shade) = self.shade_cover.get() else {
            return Ok(());
        };
        self.shade_tap_to_close.set(options.tap_to_close);

        {
            let mut tree = self.tree.borrow_mut();
            tree.set_style_property(
                shade,
                "background-color",
                PropertyValue::Text(options.color.clone().into()),
            )?;
        }

        let base = options
            .animation
            .as_ref()
            .and_then(|a| a.enter_from)
            .unwrap_or(SHADE_COVER_TRANSITION);
        let mut target = DEFAULT_TRANSITION;
        target.opacity = options.opacity;
        target.duration_ms = base.duration_ms;
        target.curve = base.curve;

        let animation = Animation::new(self.driver.clone(), vec![target.definition_for(shade)]);
        self.play_tracked(AnimationKind::Shade, shade, animation).await?;

        self.tree
            .borrow_mut()
            .set_style_property(shade, "opacity", PropertyValue::number(options.opacity))?;
        Ok(())
    }

    async fn close_shade_cover(
        &self,
        options: Option<ShadeCoverOptions>,
    ) -> Result<(), OverlayError> {
        let Some(shade) = self.shade_cover.get() else {
            return Ok(());
        };

        let exit = options
            .as_ref()
            .and_then(|o| o.animation.as_ref())
            .and_then(|a| a.exit_to)
            .unwrap_or(SHADE_COVER_TRANSITION);
        let animation = Animation::new(self.driver.clone(), vec![exit.definition_for(shade)]);
        self.play_tracked(AnimationKind::Shade, shade, animation).await?;

        self.shade_cover.set(None);
        self.shade_tap_to_close.set(false);
        self.prune_animations(shade);

        let mut tree = self.tree.borrow_mut();
        if tree.dom().node(shade).parent().is_some() {
            tree.remove_child(self.root, shade)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Animation plumbing
    // ------------------------------------------------------------------

    /// Track an in-flight animation per (view, kind); a new one implicitly
    /// cancels the prior.
    async fn play_tracked(
        &self,
        kind: AnimationKind,
        view: NodeId,
        animation: Animation,
    ) -> Result<(), OverlayError> {
        let token = self.next_animation_token.get();
        self.next_animation_token.set(token + 1);

        let prior = self.active_animations.borrow_mut().insert((view, kind), token);
        if prior.is_some() {
            self.driver.cancel(view);
        }

        let result = animation.play().await;

        {
            let mut table = self.active_animations.borrow_mut();
            if table.get(&(view, kind)) == Some(&token) {
                table.remove(&(view, kind));
            }
        }

        result.map_err(|source| OverlayError::Animation { kind, source })
    }

    /// Drop animation tracking for a view whose native view is going away.
    fn prune_animations(&self, view: NodeId) {
        self.active_animations
            .borrow_mut()
            .retain(|(v, _), _| *v != view);
    }

    fn enter_animation(&self, view: NodeId, enter_from: Option<&TransitionAnimation>) -> Animation {
        // Enter always lands on the identity state; the from-state only
        // contributes timing.
        let options = enter_from.copied().unwrap_or(DEFAULT_TRANSITION);
        let mut target = DEFAULT_TRANSITION;
        target.duration_ms = options.duration_ms;
        target.curve = options.curve;
        Animation::new(self.driver.clone(), vec![target.definition_for(view)])
    }

    fn exit_animation(&self, view: NodeId, exit_to: &TransitionAnimation) -> Animation {
        Animation::new(self.driver.clone(), vec![exit_to.definition_for(view)])
    }

    /// Write one transition state's transform/opacity to the view's style.
    fn apply_transition_state(
        &self,
        view: NodeId,
        state: &TransitionAnimation,
    ) -> Result<(), OverlayError> {
        let mut tree = self.tree.borrow_mut();
        tree.set_style_property(view, "translate-x", PropertyValue::number(state.translate_x))?;
        tree.set_style_property(view, "translate-y", PropertyValue::number(state.translate_y))?;
        tree.set_style_property(view, "scale-x", PropertyValue::number(state.scale_x))?;
        tree.set_style_property(view, "scale-y", PropertyValue::number(state.scale_y))?;
        tree.set_style_property(view, "rotate", PropertyValue::number(state.rotate))?;
        tree.set_style_property(view, "opacity", PropertyValue::number(state.opacity))?;
        Ok(())
    }

    fn reorder_native_to_front(&self, view: NodeId) -> Result<(), OverlayError> {
        self.tree.borrow_mut().reorder_to_front(self.root, view)?;
        Ok(())
    }

    fn notify(&self, view: NodeId, event_name: &str) {
        let mut event = Event::new(event_name);
        self.tree.borrow().dispatch_event(view, &mut event);
    }

    fn popup_index(&self, view: NodeId) -> Option<usize> {
        self.popup_views.borrow().iter().position(|r| r.view == view)
    }
}
