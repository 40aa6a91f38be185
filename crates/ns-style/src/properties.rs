//! Property bags and per-type default tables
//!
//! Defaults live in static tables consulted on read instead of being
//! stamped onto every instance. A bag only stores values that differ from
//! the table, each tagged with where it came from; inherited values are
//! droppable as a group when a view detaches.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::ValidationError;

/// A property value
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Bool(bool),
    Number(f64),
    Text(Cow<'static, str>),
}

impl PropertyValue {
    pub const fn bool(v: bool) -> Self {
        PropertyValue::Bool(v)
    }

    pub const fn number(v: f64) -> Self {
        PropertyValue::Number(v)
    }

    pub const fn text(v: &'static str) -> Self {
        PropertyValue::Text(Cow::Borrowed(v))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            PropertyValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(t) => Some(t),
            _ => None,
        }
    }
}

/// Where a stored value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueSource {
    Default,
    Inherited,
    Local,
}

/// Property descriptor in a per-type default table
#[derive(Debug, Clone)]
pub struct PropertyMeta {
    pub name: &'static str,
    pub default: PropertyValue,
    pub inheritable: bool,
    pub affects_layout: bool,
}

impl PropertyMeta {
    pub const fn new(name: &'static str, default: PropertyValue) -> Self {
        Self {
            name,
            default,
            inheritable: false,
            affects_layout: false,
        }
    }

    pub const fn inheritable(mut self) -> Self {
        self.inheritable = true;
        self
    }

    pub const fn affects_layout(mut self) -> Self {
        self.affects_layout = true;
        self
    }
}

/// A per-type default table
pub type PropertyTable = &'static [PropertyMeta];

/// Base view properties shared by every view type
pub static BASE_VIEW_PROPERTIES: &[PropertyMeta] = &[
    PropertyMeta::new("id", PropertyValue::text("")),
    PropertyMeta::new("class-name", PropertyValue::text("")),
    PropertyMeta::new("hidden", PropertyValue::bool(false)),
    PropertyMeta::new("binding-context", PropertyValue::text("")).inheritable(),
];

/// Base CSS properties shared by every view type
pub static BASE_CSS_PROPERTIES: &[PropertyMeta] = &[
    PropertyMeta::new("color", PropertyValue::text("")).inheritable(),
    PropertyMeta::new("font-size", PropertyValue::number(14.0))
        .inheritable()
        .affects_layout(),
    PropertyMeta::new("background-color", PropertyValue::text("")),
    PropertyMeta::new("opacity", PropertyValue::number(1.0)),
    PropertyMeta::new("translate-x", PropertyValue::number(0.0)),
    PropertyMeta::new("translate-y", PropertyValue::number(0.0)),
    PropertyMeta::new("scale-x", PropertyValue::number(1.0)),
    PropertyMeta::new("scale-y", PropertyValue::number(1.0)),
    PropertyMeta::new("rotate", PropertyValue::number(0.0)),
    PropertyMeta::new("vertical-alignment", PropertyValue::text("stretch")).affects_layout(),
];

/// Sparse property store consulted against a default table
#[derive(Debug, Clone)]
pub struct PropertyBag {
    table: PropertyTable,
    values: HashMap<&'static str, (PropertyValue, ValueSource)>,
}

impl PropertyBag {
    pub fn new(table: PropertyTable) -> Self {
        Self {
            table,
            values: HashMap::new(),
        }
    }

    pub fn table(&self) -> PropertyTable {
        self.table
    }

    pub fn meta(&self, name: &str) -> Option<&'static PropertyMeta> {
        let table = self.table;
        table.iter().find(|m| m.name == name)
    }

    /// Effective value: local, else inherited, else the table default.
    /// None for properties the table does not know.
    pub fn get(&self, name: &str) -> Option<PropertyValue> {
        let meta = self.meta(name)?;
        Some(match self.values.get(meta.name) {
            Some((value, _)) => value.clone(),
            None => meta.default.clone(),
        })
    }

    pub fn source(&self, name: &str) -> ValueSource {
        self.values
            .get(name)
            .map(|(_, source)| *source)
            .unwrap_or(ValueSource::Default)
    }

    /// Whether the property holds a locally set value
    pub fn is_set(&self, name: &str) -> bool {
        self.source(name) == ValueSource::Local
    }

    /// Set a value on behalf of the owner.
    pub fn set_local(&mut self, name: &str, value: PropertyValue) -> Result<(), ValidationError> {
        let meta = self
            .meta(name)
            .ok_or_else(|| ValidationError::UnknownProperty(name.to_owned()))?;
        self.values.insert(meta.name, (value, ValueSource::Local));
        Ok(())
    }

    /// Unset a local value, falling back to inherited/default.
    pub fn reset_local(&mut self, name: &str) {
        if self.is_set(name) {
            self.values.remove(name);
        }
    }

    fn set_inherited(&mut self, name: &'static str, value: PropertyValue) {
        self.values.insert(name, (value, ValueSource::Inherited));
    }

    /// Drop every inherited entry.
    pub fn clear_inherited(&mut self) {
        self.values
            .retain(|_, (_, source)| *source != ValueSource::Inherited);
    }

    /// Iterate (name, effective value, source) over every stored entry.
    pub fn stored_entries(&self) -> impl Iterator<Item = (&'static str, &PropertyValue, ValueSource)> {
        self.values
            .iter()
            .map(|(name, (value, source))| (*name, value, *source))
    }
}

/// Copy the parent's effective value of every inheritable property into the
/// child as `Inherited`, never overwriting a local value.
pub fn propagate_inheritable_properties(parent: &PropertyBag, child: &mut PropertyBag) {
    for meta in parent.table.iter().filter(|m| m.inheritable) {
        if child.is_set(meta.name) {
            continue;
        }
        if parent.source(meta.name) == ValueSource::Default {
            continue;
        }
        if let Some(value) = parent.get(meta.name) {
            child.set_inherited(meta.name, value);
        }
    }
}

/// CSS flavor of [`propagate_inheritable_properties`]; same rules against
/// the CSS table.
pub fn propagate_inheritable_css_properties(parent_style: &PropertyBag, child_style: &mut PropertyBag) {
    propagate_inheritable_properties(parent_style, child_style);
}

/// Drop inherited values from a bag (the view detached from its parent).
pub fn clear_inherited_properties(bag: &mut PropertyBag) {
    bag.clear_inherited();
}
