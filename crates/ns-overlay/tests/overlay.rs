//! Root layout integration tests
//!
//! Popup stack semantics, shade cover lifecycle, animation orchestration.

use std::cell::RefCell;
use std::rc::Rc;

use futures::FutureExt;
use ns_animation::{
    AnimationDefinition, AnimationDriver, AnimationError, RecordingDriver, TransitionAnimation,
};
use ns_dom::{ListenerOptions, NodeId};
use ns_overlay::{
    AnimationKind, OverlayError, RootLayout, RootLayoutOptions, ShadeCoverOptions, TransitionPair,
};
use ns_view::{PlaceholderHooks, RenderContext, ViewTree};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

struct Fixture {
    tree: Rc<RefCell<ViewTree>>,
    root: NodeId,
    driver: Rc<RecordingDriver>,
    layout: RootLayout,
}

fn fixture() -> Fixture {
    init_tracing();
    let tree = Rc::new(RefCell::new(ViewTree::new()));
    let root = {
        let mut t = tree.borrow_mut();
        let root = t.create_view("root-layout", Rc::new(PlaceholderHooks));
        let content = t.create_view("stack-layout", Rc::new(PlaceholderHooks));
        t.append_child(root, content).unwrap();
        t.render_native_view(root, RenderContext::new("activity"), None);
        t.connected_callback(root);
        root
    };

    let driver = Rc::new(RecordingDriver::new());
    let layout = RootLayout::new(
        tree.clone(),
        root,
        driver.clone(),
        Box::new(|t| t.create_view("grid-layout", Rc::new(PlaceholderHooks))),
    );
    Fixture {
        tree,
        root,
        driver,
        layout,
    }
}

impl Fixture {
    fn popup(&self) -> NodeId {
        self.tree
            .borrow_mut()
            .create_view("content-view", Rc::new(PlaceholderHooks))
    }

    fn event_counter(&self, view: NodeId, event_type: &str) -> Rc<RefCell<u32>> {
        let counter = Rc::new(RefCell::new(0));
        let clone = counter.clone();
        self.tree.borrow().dom().node(view).events().add_event_listener(
            event_type,
            move |_| *clone.borrow_mut() += 1,
            ListenerOptions::default(),
        );
        counter
    }

    fn style_number(&self, view: NodeId, name: &str) -> f64 {
        self.tree
            .borrow()
            .style_value(view, name)
            .and_then(|v| v.as_number())
            .unwrap()
    }

    fn shade_options(opacity: f64) -> RootLayoutOptions {
        RootLayoutOptions {
            shade_cover: Some(ShadeCoverOptions {
                opacity,
                ..Default::default()
            }),
            ..Default::default()
        }
    }
}

#[test]
fn test_open_attaches_notifies_and_settles_visible() {
    let f = fixture();
    let popup = f.popup();
    let opened = f.event_counter(popup, "opened");

    smol::block_on(f.layout.open(popup, RootLayoutOptions::default())).unwrap();

    assert!(f.layout.is_open(popup));
    assert_eq!(f.layout.topmost(), Some(popup));
    assert_eq!(f.tree.borrow().dom().node(popup).parent(), Some(f.root));
    assert!(f.tree.borrow().state(popup).is_connected());
    assert_eq!(f.style_number(popup, "opacity"), 1.0);
    assert_eq!(*opened.borrow(), 1);
    // The enter animation reached the driver.
    assert!(f.driver.played().iter().any(|d| d.target == popup));
}

#[test]
fn test_open_same_view_twice_rejects() {
    let f = fixture();
    let popup = f.popup();

    smol::block_on(f.layout.open(popup, RootLayoutOptions::default())).unwrap();
    let err = smol::block_on(f.layout.open(popup, RootLayoutOptions::default())).unwrap_err();

    assert_eq!(err, OverlayError::AlreadyOpen);
    assert_eq!(f.layout.popup_count(), 1);
}

#[test]
fn test_open_non_view_rejects() {
    let f = fixture();
    let text = f.tree.borrow_mut().create_text("plain");

    let err = smol::block_on(f.layout.open(text, RootLayoutOptions::default())).unwrap_err();
    assert_eq!(err, OverlayError::InvalidView { operation: "open" });
}

#[test]
fn test_close_detaches_and_notifies() {
    let f = fixture();
    let popup = f.popup();
    let closed = f.event_counter(popup, "closed");

    smol::block_on(f.layout.open(popup, RootLayoutOptions::default())).unwrap();
    smol::block_on(f.layout.close(popup)).unwrap();

    assert!(!f.layout.is_open(popup));
    assert_eq!(f.layout.topmost(), None);
    assert_eq!(f.tree.borrow().dom().node(popup).parent(), None);
    assert_eq!(*closed.borrow(), 1);
}

#[test]
fn test_close_unknown_view_rejects() {
    let f = fixture();
    let popup = f.popup();

    let err = smol::block_on(f.layout.close(popup)).unwrap_err();
    assert_eq!(err, OverlayError::NotOpen);
}

#[test]
fn test_single_shade_cover_restored_to_remaining_popup() {
    let f = fixture();
    let popup_a = f.popup();
    let popup_b = f.popup();

    smol::block_on(f.layout.open(popup_a, Fixture::shade_options(0.5))).unwrap();
    let shade = f.layout.get_shade_cover().unwrap();

    smol::block_on(f.layout.open(popup_b, Fixture::shade_options(0.9))).unwrap();
    // The second popup updated the one shade cover instead of stacking
    // another.
    assert_eq!(f.layout.get_shade_cover(), Some(shade));
    assert_eq!(f.style_number(shade, "opacity"), 0.9);
    // root children: static content, shade, popup A, popup B
    assert_eq!(f.tree.borrow().dom().child_count(f.root), 4);

    smol::block_on(f.layout.close(popup_b)).unwrap();

    // The shade survives popup A's request and reflects A's options again.
    assert_eq!(f.layout.get_shade_cover(), Some(shade));
    assert_eq!(f.style_number(shade, "opacity"), 0.5);
    assert_eq!(f.tree.borrow().dom().child_count(f.root), 3);
}

#[test]
fn test_closing_last_popup_closes_shade_cover() {
    let f = fixture();
    let popup = f.popup();

    smol::block_on(f.layout.open(popup, Fixture::shade_options(0.5))).unwrap();
    let shade = f.layout.get_shade_cover().unwrap();

    smol::block_on(f.layout.close(popup)).unwrap();

    assert_eq!(f.layout.get_shade_cover(), None);
    assert_eq!(f.tree.borrow().dom().node(shade).parent(), None);
    assert_eq!(f.tree.borrow().dom().child_count(f.root), 1);
}

#[test]
fn test_shade_sits_below_popups() {
    let f = fixture();
    let popup = f.popup();

    smol::block_on(f.layout.open(popup, Fixture::shade_options(0.5))).unwrap();
    let shade = f.layout.get_shade_cover().unwrap();

    let children: Vec<_> = f.tree.borrow().dom().child_nodes(f.root).collect();
    let shade_pos = children.iter().position(|&c| c == shade).unwrap();
    let popup_pos = children.iter().position(|&c| c == popup).unwrap();
    assert!(shade_pos < popup_pos);
    assert_eq!(shade_pos, 1); // right above the static content
}

#[test]
fn test_bring_to_front_of_topmost_rejects_without_reorder() {
    let f = fixture();
    let popup_a = f.popup();
    let popup_b = f.popup();
    smol::block_on(f.layout.open(popup_a, RootLayoutOptions::default())).unwrap();
    smol::block_on(f.layout.open(popup_b, RootLayoutOptions::default())).unwrap();

    let err = smol::block_on(f.layout.bring_to_front(popup_b, false)).unwrap_err();

    assert_eq!(err, OverlayError::NotOpenOrTopmost);
    assert_eq!(f.layout.topmost(), Some(popup_b));
}

#[test]
fn test_bring_to_front_reorders_stack_and_tree() {
    let f = fixture();
    let popup_a = f.popup();
    let popup_b = f.popup();
    smol::block_on(f.layout.open(popup_a, RootLayoutOptions::default())).unwrap();
    smol::block_on(f.layout.open(popup_b, RootLayoutOptions::default())).unwrap();

    smol::block_on(f.layout.bring_to_front(popup_a, false)).unwrap();

    assert_eq!(f.layout.topmost(), Some(popup_a));
    assert_eq!(
        f.tree.borrow().dom().node(f.root).last_child(),
        Some(popup_a)
    );
    // Still open, still two popups.
    assert_eq!(f.layout.popup_count(), 2);
}

#[test]
fn test_bring_to_front_animated_replays_exit_then_enter() {
    let f = fixture();
    let popup_a = f.popup();
    let popup_b = f.popup();

    let animated = RootLayoutOptions {
        animation: Some(TransitionPair {
            enter_from: Some(TransitionAnimation {
                translate_y: 400.0,
                ..Default::default()
            }),
            exit_to: Some(TransitionAnimation {
                translate_y: 400.0,
                opacity: 0.0,
                ..Default::default()
            }),
        }),
        ..Default::default()
    };
    smol::block_on(f.layout.open(popup_a, animated)).unwrap();
    smol::block_on(f.layout.open(popup_b, RootLayoutOptions::default())).unwrap();

    let plays_before = f.driver.played().len();
    smol::block_on(f.layout.bring_to_front(popup_a, true)).unwrap();

    let plays: Vec<AnimationDefinition> = f.driver.played()[plays_before..].to_vec();
    // Exit transform first, then the enter transition back to identity.
    assert_eq!(plays.len(), 2);
    assert_eq!(plays[0].translate, (0.0, 400.0));
    assert_eq!(plays[1].translate, (0.0, 0.0));
    // Settled back at the default state.
    assert_eq!(f.style_number(popup_a, "translate-y"), 0.0);
    assert_eq!(f.style_number(popup_a, "opacity"), 1.0);
}

#[test]
fn test_close_all_empties_the_stack() {
    let f = fixture();
    let popups = [f.popup(), f.popup(), f.popup()];
    for popup in popups {
        smol::block_on(f.layout.open(popup, Fixture::shade_options(0.5))).unwrap();
    }

    smol::block_on(f.layout.close_all()).unwrap();

    assert_eq!(f.layout.popup_count(), 0);
    assert_eq!(f.layout.get_shade_cover(), None);
    assert_eq!(f.tree.borrow().dom().child_count(f.root), 1);
}

#[test]
fn test_exit_override_replaces_declared_exit() {
    let f = fixture();
    let popup = f.popup();
    smol::block_on(f.layout.open(popup, RootLayoutOptions::default())).unwrap();

    let override_exit = TransitionAnimation {
        translate_y: 300.0,
        opacity: 0.0,
        ..Default::default()
    };
    smol::block_on(f.layout.close_with(popup, Some(override_exit))).unwrap();

    assert!(f
        .driver
        .played()
        .iter()
        .any(|d| d.target == popup && d.translate == (0.0, 300.0)));
}

struct FailingDriver;

impl AnimationDriver for FailingDriver {
    fn play(
        &self,
        _definition: AnimationDefinition,
    ) -> futures::future::LocalBoxFuture<'static, Result<(), AnimationError>> {
        futures::future::ready(Err(AnimationError::Driver("engine rejected".into()))).boxed_local()
    }

    fn cancel(&self, _target: NodeId) {}
}

#[test]
fn test_animation_failure_rejects_open_with_wrapped_error() {
    init_tracing();
    let tree = Rc::new(RefCell::new(ViewTree::new()));
    let root = {
        let mut t = tree.borrow_mut();
        let root = t.create_view("root-layout", Rc::new(PlaceholderHooks));
        t.render_native_view(root, RenderContext::new("activity"), None);
        t.connected_callback(root);
        root
    };
    let layout = RootLayout::new(
        tree.clone(),
        root,
        Rc::new(FailingDriver),
        Box::new(|t| t.create_view("grid-layout", Rc::new(PlaceholderHooks))),
    );
    let popup = tree
        .borrow_mut()
        .create_view("content-view", Rc::new(PlaceholderHooks));

    let err = smol::block_on(layout.open(popup, RootLayoutOptions::default())).unwrap_err();

    assert_eq!(
        err,
        OverlayError::Animation {
            kind: AnimationKind::Enter,
            source: AnimationError::Driver("engine rejected".to_string()),
        }
    );
}

#[test]
fn test_shade_tap_closes_all_when_enabled() {
    let f = fixture();
    let popup = f.popup();
    smol::block_on(f.layout.open(popup, Fixture::shade_options(0.5))).unwrap();

    smol::block_on(f.layout.handle_shade_tap()).unwrap();

    assert_eq!(f.layout.popup_count(), 0);
    assert_eq!(f.layout.get_shade_cover(), None);
}

#[test]
fn test_shade_tap_ignored_when_disabled() {
    let f = fixture();
    let popup = f.popup();
    let options = RootLayoutOptions {
        shade_cover: Some(ShadeCoverOptions {
            tap_to_close: false,
            ..Default::default()
        }),
        ..Default::default()
    };
    smol::block_on(f.layout.open(popup, options)).unwrap();

    smol::block_on(f.layout.handle_shade_tap()).unwrap();

    assert_eq!(f.layout.popup_count(), 1);
}

#[test]
fn test_livesync_closes_open_popups() {
    let f = fixture();
    assert!(!smol::block_on(f.layout.on_livesync()).unwrap());

    let popup = f.popup();
    smol::block_on(f.layout.open(popup, RootLayoutOptions::default())).unwrap();

    assert!(smol::block_on(f.layout.on_livesync()).unwrap());
    assert_eq!(f.layout.popup_count(), 0);
}

#[test]
fn test_options_deserialize_from_json() {
    let json = r#"{
        "shadeCover": { "opacity": 0.8, "tapToClose": false },
        "animation": {
            "enterFrom": { "translateY": 500.0, "duration": 150 }
        }
    }"#;

    let options: RootLayoutOptions = serde_json::from_str(json).unwrap();

    let shade = options.shade_cover.unwrap();
    assert_eq!(shade.opacity, 0.8);
    assert!(!shade.tap_to_close);
    assert_eq!(shade.color, "#000000");

    let enter = options.animation.unwrap().enter_from.unwrap();
    assert_eq!(enter.translate_y, 500.0);
    assert_eq!(enter.duration_ms, 150);
    assert_eq!(enter.scale_x, 1.0);
    assert_eq!(enter.opacity, 1.0);
}
