//! Overlay configuration
//!
//! Declarative option types fed to `open`/`close`. Serde-enabled so popup
//! configuration can ship as JSON alongside stylesheets.

use ns_animation::TransitionAnimation;
use serde::{Deserialize, Serialize};

/// Enter/exit transition states for a popup
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TransitionPair {
    /// State the view animates in from
    pub enter_from: Option<TransitionAnimation>,
    /// State the view animates out to
    pub exit_to: Option<TransitionAnimation>,
}

/// Options for one `open` call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RootLayoutOptions {
    /// Request the shared shade cover below this popup
    pub shade_cover: Option<ShadeCoverOptions>,
    pub animation: Option<TransitionPair>,
}

/// Shade cover appearance and behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShadeCoverOptions {
    pub opacity: f64,
    pub color: String,
    /// Tapping the shade closes every popup
    pub tap_to_close: bool,
    pub animation: Option<TransitionPair>,
    /// On close, skip restoring the next-topmost popup's shade options
    pub ignore_shade_restore: bool,
}

impl Default for ShadeCoverOptions {
    fn default() -> Self {
        Self {
            opacity: 0.5,
            color: "#000000".to_owned(),
            tap_to_close: true,
            animation: None,
            ignore_shade_restore: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shade_cover_defaults() {
        let options = ShadeCoverOptions::default();
        assert_eq!(options.opacity, 0.5);
        assert_eq!(options.color, "#000000");
        assert!(options.tap_to_close);
        assert!(!options.ignore_shade_restore);
    }
}
