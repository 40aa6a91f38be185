//! Event dispatch integration tests
//!
//! Capture/bubble ordering, propagation control, once/passive/signal
//! listener options.

use std::cell::RefCell;
use std::rc::Rc;

use ns_dom::{AbortController, Event, EventInit, ListenerOptions, Tree};

fn log_listener(
    log: &Rc<RefCell<Vec<&'static str>>>,
    name: &'static str,
) -> impl FnMut(&mut Event) + 'static {
    let log = log.clone();
    move |_| log.borrow_mut().push(name)
}

#[test]
fn test_bubble_order_is_target_first() {
    let mut tree = Tree::new();
    let root = tree.create_element("root-layout");
    let mid = tree.create_element("stack-layout");
    let leaf = tree.create_element("button");
    tree.append_child(root, mid).unwrap();
    tree.append_child(mid, leaf).unwrap();

    let log = Rc::new(RefCell::new(Vec::new()));
    for (id, name) in [(leaf, "leaf"), (mid, "mid"), (root, "root")] {
        tree.node(id)
            .events()
            .add_event_listener("tap", log_listener(&log, name), ListenerOptions::default());
    }

    let mut event = Event::with_init(
        "tap",
        EventInit {
            bubbles: true,
            ..Default::default()
        },
    );
    tree.dispatch_event(leaf, &mut event);

    assert_eq!(*log.borrow(), vec!["leaf", "mid", "root"]);
}

#[test]
fn test_capture_order_is_root_first() {
    let mut tree = Tree::new();
    let root = tree.create_element("root-layout");
    let mid = tree.create_element("stack-layout");
    let leaf = tree.create_element("button");
    tree.append_child(root, mid).unwrap();
    tree.append_child(mid, leaf).unwrap();

    let log = Rc::new(RefCell::new(Vec::new()));
    for (id, name) in [(leaf, "leaf"), (mid, "mid"), (root, "root")] {
        tree.node(id).events().add_event_listener(
            "tap",
            log_listener(&log, name),
            ListenerOptions {
                capture: true,
                ..Default::default()
            },
        );
    }

    let mut event = Event::with_init(
        "tap",
        EventInit {
            bubbles: true,
            captures: true,
            ..Default::default()
        },
    );
    tree.dispatch_event(leaf, &mut event);

    // Capture runs root-first, then the bubble phase finds no listeners.
    assert_eq!(*log.borrow(), vec!["root", "mid", "leaf"]);
}

#[test]
fn test_stop_propagation_at_middle_ancestor() {
    // leaf -> parent -> grandparent -> root; the parent stops propagation,
    // so the grandparent and root never hear the event.
    let mut tree = Tree::new();
    let root = tree.create_element("root-layout");
    let grandparent = tree.create_element("grid-layout");
    let parent = tree.create_element("stack-layout");
    let leaf = tree.create_element("button");
    tree.append_child(root, grandparent).unwrap();
    tree.append_child(grandparent, parent).unwrap();
    tree.append_child(parent, leaf).unwrap();

    let log = Rc::new(RefCell::new(Vec::new()));
    tree.node(leaf)
        .events()
        .add_event_listener("tap", log_listener(&log, "leaf"), ListenerOptions::default());
    {
        let log = log.clone();
        tree.node(parent).events().add_event_listener(
            "tap",
            move |event| {
                log.borrow_mut().push("parent");
                event.stop_propagation();
            },
            ListenerOptions::default(),
        );
    }
    tree.node(grandparent).events().add_event_listener(
        "tap",
        log_listener(&log, "grandparent"),
        ListenerOptions::default(),
    );
    tree.node(root)
        .events()
        .add_event_listener("tap", log_listener(&log, "root"), ListenerOptions::default());

    let mut event = Event::with_init(
        "tap",
        EventInit {
            bubbles: true,
            cancelable: true,
            ..Default::default()
        },
    );
    let not_prevented = tree.dispatch_event(leaf, &mut event);

    assert!(not_prevented);
    assert_eq!(*log.borrow(), vec!["leaf", "parent"]);
}

#[test]
fn test_stop_immediate_propagation_skips_rest_of_store() {
    let mut tree = Tree::new();
    let node = tree.create_element("button");

    let log = Rc::new(RefCell::new(Vec::new()));
    {
        let log = log.clone();
        tree.node(node).events().add_event_listener(
            "tap",
            move |event| {
                log.borrow_mut().push("first");
                event.stop_immediate_propagation();
            },
            ListenerOptions::default(),
        );
    }
    tree.node(node)
        .events()
        .add_event_listener("tap", log_listener(&log, "second"), ListenerOptions::default());

    let mut event = Event::new("tap");
    tree.dispatch_event(node, &mut event);

    assert_eq!(*log.borrow(), vec!["first"]);
}

#[test]
fn test_prevent_default_return_value() {
    let mut tree = Tree::new();
    let node = tree.create_element("button");
    tree.node(node).events().add_event_listener(
        "tap",
        |event| event.prevent_default(),
        ListenerOptions::default(),
    );

    let mut cancelable = Event::with_init(
        "tap",
        EventInit {
            cancelable: true,
            ..Default::default()
        },
    );
    assert!(!tree.dispatch_event(node, &mut cancelable));
}

#[test]
fn test_passive_listener_cannot_prevent_default() {
    let mut tree = Tree::new();
    let node = tree.create_element("scroll-view");
    tree.node(node).events().add_event_listener(
        "pan",
        |event| event.prevent_default(),
        ListenerOptions {
            passive: true,
            ..Default::default()
        },
    );

    let mut event = Event::with_init(
        "pan",
        EventInit {
            cancelable: true,
            ..Default::default()
        },
    );
    assert!(tree.dispatch_event(node, &mut event));
}

#[test]
fn test_once_listener_fires_exactly_once() {
    let mut tree = Tree::new();
    let node = tree.create_element("button");

    let count = Rc::new(RefCell::new(0));
    {
        let count = count.clone();
        tree.node(node).events().add_event_listener(
            "tap",
            move |_| *count.borrow_mut() += 1,
            ListenerOptions {
                once: true,
                ..Default::default()
            },
        );
    }

    tree.dispatch_event(node, &mut Event::new("tap"));
    tree.dispatch_event(node, &mut Event::new("tap"));

    assert_eq!(*count.borrow(), 1);
    assert!(!tree.node(node).events().has_listeners("tap"));
}

#[test]
fn test_abort_mid_dispatch_skips_scheduled_listener() {
    let mut tree = Tree::new();
    let node = tree.create_element("button");
    let controller = Rc::new(AbortController::new());

    let log = Rc::new(RefCell::new(Vec::new()));
    {
        let log = log.clone();
        let controller = controller.clone();
        tree.node(node).events().add_event_listener(
            "tap",
            move |_| {
                log.borrow_mut().push("first");
                controller.abort();
            },
            ListenerOptions::default(),
        );
    }
    {
        let log = log.clone();
        tree.node(node).events().add_event_listener(
            "tap",
            move |_| log.borrow_mut().push("second"),
            ListenerOptions {
                signal: Some(controller.signal()),
                ..Default::default()
            },
        );
    }

    tree.dispatch_event(node, &mut Event::new("tap"));

    // The second listener was in the snapshot but its descriptor was
    // marked removed before it ran.
    assert_eq!(*log.borrow(), vec!["first"]);
    assert!(!tree.node(node).events().has_listeners("tap"));
}

#[test]
fn test_listener_added_mid_dispatch_waits_for_next_dispatch() {
    let mut tree = Tree::new();
    let node = tree.create_element("button");
    let events = Rc::new(RefCell::new(Vec::<&'static str>::new()));

    let target = tree.node(node).events();
    {
        let events = events.clone();
        let late_events = events.clone();
        let target_handle = target_handle_for_test(&tree, node);
        target.add_event_listener(
            "tap",
            move |_| {
                events.borrow_mut().push("outer");
                let late_events = late_events.clone();
                target_handle.add_event_listener(
                    "tap",
                    move |_| late_events.borrow_mut().push("late"),
                    ListenerOptions::default(),
                );
            },
            ListenerOptions::default(),
        );
    }

    tree.dispatch_event(node, &mut Event::new("tap"));
    assert_eq!(*events.borrow(), vec!["outer"]);
}

// Registering from inside a handler needs an owned handle onto the same
// listener stores; cloning the per-node EventTarget shares them.
fn target_handle_for_test(tree: &Tree, node: ns_dom::NodeId) -> ns_dom::EventTarget {
    tree.node(node).events().clone()
}
