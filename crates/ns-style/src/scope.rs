//! Style scopes and per-view CSS state
//!
//! A style scope is the shared handle a subtree inherits from its scope
//! host. Scope identity is what matters to the core; the rule set behind
//! it belongs to the styling engine.

use std::rc::Rc;

#[derive(Debug)]
struct ScopeInner {
    name: String,
}

/// Shared style-scope handle with identity semantics
#[derive(Debug, Clone)]
pub struct StyleScope {
    inner: Rc<ScopeInner>,
}

impl StyleScope {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(ScopeInner { name: name.into() }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }
}

impl PartialEq for StyleScope {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for StyleScope {}

/// Per-view bookkeeping driven by load/unload and scope changes.
///
/// The counters make change notifications observable without dragging the
/// selector engine into the core.
#[derive(Debug, Default)]
pub struct CssState {
    loaded: bool,
    change_count: u32,
}

impl CssState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_loaded(&mut self) {
        self.loaded = true;
        tracing::trace!("css state loaded");
    }

    pub fn on_unloaded(&mut self) {
        self.loaded = false;
        tracing::trace!("css state unloaded");
    }

    pub fn on_change(&mut self) {
        self.change_count += 1;
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn change_count(&self) -> u32 {
        self.change_count
    }
}
