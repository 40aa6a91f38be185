//! View registry
//!
//! Explicit process-wide registry mapping view type names to their
//! capability table and property tables. Injected where needed; never a
//! global mutated on module load.

use std::collections::HashMap;

use ns_dom::NodeId;
use ns_style::{PropertyTable, BASE_CSS_PROPERTIES, BASE_VIEW_PROPERTIES};

use crate::hooks::SharedHooks;
use crate::view_tree::ViewTree;

/// Everything needed to instantiate a view type
#[derive(Clone)]
pub struct ViewFactory {
    pub hooks: SharedHooks,
    pub view_table: PropertyTable,
    pub css_table: PropertyTable,
}

impl ViewFactory {
    pub fn new(hooks: SharedHooks) -> Self {
        Self {
            hooks,
            view_table: BASE_VIEW_PROPERTIES,
            css_table: BASE_CSS_PROPERTIES,
        }
    }

    pub fn with_tables(hooks: SharedHooks, view_table: PropertyTable, css_table: PropertyTable) -> Self {
        Self {
            hooks,
            view_table,
            css_table,
        }
    }
}

/// Type-name to factory mapping
#[derive(Default)]
pub struct ViewRegistry {
    factories: HashMap<String, ViewFactory>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a view type, replacing any previous registration.
    pub fn register(&mut self, type_name: &str, factory: ViewFactory) {
        tracing::debug!(type_name, "register view type");
        self.factories.insert(type_name.to_owned(), factory);
    }

    pub fn is_registered(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Instantiate a registered type into the tree. None for unknown types.
    pub fn create(&self, tree: &mut ViewTree, type_name: &str) -> Option<NodeId> {
        let factory = self.factories.get(type_name)?;
        Some(tree.create_view_with_tables(
            type_name,
            factory.hooks.clone(),
            factory.view_table,
            factory.css_table,
        ))
    }

    /// Teardown: drop every registration.
    pub fn reset(&mut self) {
        self.factories.clear();
    }
}
