//! NativeScript style interface
//!
//! Not a selector engine. These are the property bags, per-type default
//! tables, and style-scope handles the view-synchronization layer consumes;
//! selector matching and cascade resolution live behind them.

mod properties;
mod scope;

pub use properties::{
    clear_inherited_properties, propagate_inheritable_css_properties,
    propagate_inheritable_properties, PropertyBag, PropertyMeta, PropertyTable, PropertyValue,
    ValueSource, BASE_CSS_PROPERTIES, BASE_VIEW_PROPERTIES,
};
pub use scope::{CssState, StyleScope};

/// Invalid argument errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid boolean: {0}")]
    InvalidBoolean(String),

    #[error("invalid number: {0}")]
    InvalidNumber(String),

    #[error("unknown property: {0}")]
    UnknownProperty(String),
}

/// Parse a boolean property value.
///
/// Accepts `true`/`false` in any case; anything else is a validation error.
pub fn boolean_converter(v: &str) -> Result<bool, ValidationError> {
    match v.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(ValidationError::InvalidBoolean(v.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_converter() {
        assert_eq!(boolean_converter("true"), Ok(true));
        assert_eq!(boolean_converter("False"), Ok(false));
        assert_eq!(
            boolean_converter("maybe"),
            Err(ValidationError::InvalidBoolean("maybe".to_string()))
        );
    }
}
