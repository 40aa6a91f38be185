//! Listener registries
//!
//! Each node owns two listener stores (capture phase, bubble phase), each a
//! mapping from event type to listener entries in insertion order. Stores
//! sit behind interior mutability so handlers may register or remove
//! listeners while a dispatch is iterating a snapshot.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::Event;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Listener identity handed out at registration.
///
/// Rust closures are anonymous, so the (type, listener, capture) key of the
/// DOM becomes (type, phase, id). Each registration gets a unique id, which
/// keeps every entry at most once per (type, phase) store by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

impl ListenerId {
    fn next() -> Self {
        ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Options accepted by `add_event_listener`
#[derive(Default, Clone)]
pub struct ListenerOptions {
    /// Register in the capture-phase store instead of the bubble-phase store
    pub capture: bool,
    /// Unregister before the first invocation forwards to the handler
    pub once: bool,
    /// The handler may not prevent the default action
    pub passive: bool,
    /// Removal is bound to this signal's abort
    pub signal: Option<AbortSignal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Capture,
    Bubble,
}

pub(crate) struct ListenerEntry {
    pub(crate) id: ListenerId,
    pub(crate) once: bool,
    pub(crate) passive: bool,
    /// Marked on removal; a snapshot already scheduled skips marked entries.
    pub(crate) removed: Cell<bool>,
    signal: Option<AbortSignal>,
    pub(crate) handler: RefCell<Box<dyn FnMut(&mut Event)>>,
}

type Store = Vec<Rc<ListenerEntry>>;

#[derive(Default)]
struct TargetInner {
    capture: RefCell<HashMap<String, Store>>,
    bubble: RefCell<HashMap<String, Store>>,
}

impl TargetInner {
    fn phase_store(&self, phase: Phase) -> &RefCell<HashMap<String, Store>> {
        match phase {
            Phase::Capture => &self.capture,
            Phase::Bubble => &self.bubble,
        }
    }

    fn remove(&self, event_type: &str, phase: Phase, id: ListenerId) {
        let mut stores = self.phase_store(phase).borrow_mut();
        let Some(store) = stores.get_mut(event_type) else {
            return;
        };
        let Some(idx) = store.iter().position(|e| e.id == id) else {
            return;
        };
        let entry = store.remove(idx);
        entry.removed.set(true);
        if let Some(signal) = &entry.signal {
            signal.remove_hook(id);
        }
        if store.is_empty() {
            stores.remove(event_type);
        }
    }
}

/// Per-node event target: capture and bubble listener stores.
///
/// Clones share the underlying stores, which lets a handler keep an owned
/// handle for registering listeners mid-dispatch.
#[derive(Clone)]
pub struct EventTarget {
    inner: Rc<TargetInner>,
}

impl EventTarget {
    pub(crate) fn new() -> Self {
        Self {
            inner: Rc::new(TargetInner::default()),
        }
    }

    /// Register a listener. Returns the identity used for removal.
    pub fn add_event_listener(
        &self,
        event_type: &str,
        handler: impl FnMut(&mut Event) + 'static,
        options: ListenerOptions,
    ) -> ListenerId {
        let id = ListenerId::next();
        if options.signal.as_ref().is_some_and(AbortSignal::aborted) {
            return id;
        }

        let phase = if options.capture { Phase::Capture } else { Phase::Bubble };
        let entry = Rc::new(ListenerEntry {
            id,
            once: options.once,
            passive: options.passive,
            removed: Cell::new(false),
            signal: options.signal.clone(),
            handler: RefCell::new(Box::new(handler)),
        });

        self.inner
            .phase_store(phase)
            .borrow_mut()
            .entry(event_type.to_owned())
            .or_default()
            .push(entry);

        if let Some(signal) = &options.signal {
            let weak: Weak<TargetInner> = Rc::downgrade(&self.inner);
            let ty = event_type.to_owned();
            signal.add_hook(id, move || {
                if let Some(inner) = weak.upgrade() {
                    inner.remove(&ty, phase, id);
                }
            });
        }

        id
    }

    /// Remove a listener. Idempotent; unknown ids are ignored.
    pub fn remove_event_listener(&self, event_type: &str, capture: bool, id: ListenerId) {
        let phase = if capture { Phase::Capture } else { Phase::Bubble };
        self.inner.remove(event_type, phase, id);
    }

    /// Whether any listener (either phase) is registered for the type.
    pub fn has_listeners(&self, event_type: &str) -> bool {
        self.inner.capture.borrow().contains_key(event_type)
            || self.inner.bubble.borrow().contains_key(event_type)
    }

    /// Snapshot a phase store for dispatch. Entries removed after the
    /// snapshot stay in it but are skipped via their `removed` mark.
    pub(crate) fn snapshot(&self, event_type: &str, phase: Phase) -> Option<Store> {
        self.inner
            .phase_store(phase)
            .borrow()
            .get(event_type)
            .map(|store| store.clone())
    }

    pub(crate) fn remove_entry(&self, event_type: &str, phase: Phase, id: ListenerId) {
        self.inner.remove(event_type, phase, id);
    }
}

impl std::fmt::Debug for EventTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventTarget")
            .field("capture_types", &self.inner.capture.borrow().len())
            .field("bubble_types", &self.inner.bubble.borrow().len())
            .finish()
    }
}

type AbortHook = Box<dyn Fn()>;

#[derive(Default)]
struct SignalInner {
    aborted: Cell<bool>,
    hooks: RefCell<Vec<(ListenerId, AbortHook)>>,
}

/// Abort signal bound to listeners at registration.
///
/// Firing the abort removes every bound listener exactly once, safe against
/// a dispatch concurrently iterating a snapshot.
#[derive(Clone, Default)]
pub struct AbortSignal {
    inner: Rc<SignalInner>,
}

impl AbortSignal {
    pub fn aborted(&self) -> bool {
        self.inner.aborted.get()
    }

    fn add_hook(&self, id: ListenerId, hook: impl Fn() + 'static) {
        self.inner.hooks.borrow_mut().push((id, Box::new(hook)));
    }

    fn remove_hook(&self, id: ListenerId) {
        self.inner.hooks.borrow_mut().retain(|(key, _)| *key != id);
    }

    fn fire(&self) {
        if self.inner.aborted.replace(true) {
            return;
        }
        // Hooks run after the borrow is released; a hook removing its own
        // listener re-enters remove_hook against the now-empty list.
        let hooks = std::mem::take(&mut *self.inner.hooks.borrow_mut());
        for (_, hook) in hooks {
            hook();
        }
    }
}

impl std::fmt::Debug for AbortSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AbortSignal")
            .field("aborted", &self.aborted())
            .finish()
    }
}

/// Owner side of an [`AbortSignal`].
#[derive(Debug, Default)]
pub struct AbortController {
    signal: AbortSignal,
}

impl AbortController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signal(&self) -> AbortSignal {
        self.signal.clone()
    }

    pub fn abort(&self) {
        self.signal.fire();
    }
}
