//! DOM Events
//!
//! Event state carried through capture/bubble dispatch.

use crate::NodeId;

/// Flags used to construct an [`Event`]
#[derive(Debug, Clone, Copy, Default)]
pub struct EventInit {
    pub bubbles: bool,
    pub captures: bool,
    pub cancelable: bool,
}

/// DOM event
#[derive(Debug, Clone)]
pub struct Event {
    event_type: String,
    bubbles: bool,
    captures: bool,
    cancelable: bool,
    /// Set per-listener during dispatch; a passive listener cannot prevent default.
    pub(crate) passive: bool,
    default_prevented: bool,
    pub(crate) propagation_stopped: bool,
    pub(crate) immediate_propagation_stopped: bool,
    pub(crate) target: Option<NodeId>,
    pub(crate) current_target: Option<NodeId>,
}

impl Event {
    /// Create a non-bubbling, non-cancelable event
    pub fn new(event_type: impl Into<String>) -> Self {
        Self::with_init(event_type, EventInit::default())
    }

    /// Create an event with explicit propagation flags
    pub fn with_init(event_type: impl Into<String>, init: EventInit) -> Self {
        Self {
            event_type: event_type.into(),
            bubbles: init.bubbles,
            captures: init.captures,
            cancelable: init.cancelable,
            passive: false,
            default_prevented: false,
            propagation_stopped: false,
            immediate_propagation_stopped: false,
            target: None,
            current_target: None,
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn bubbles(&self) -> bool {
        self.bubbles
    }

    pub fn captures(&self) -> bool {
        self.captures
    }

    pub fn cancelable(&self) -> bool {
        self.cancelable
    }

    /// Node the event was dispatched on
    pub fn target(&self) -> Option<NodeId> {
        self.target
    }

    /// Node whose listener store is currently being invoked
    pub fn current_target(&self) -> Option<NodeId> {
        self.current_target
    }

    /// Stop after the current phase-store finishes
    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    /// Stop mid-store, skipping remaining listeners in it
    pub fn stop_immediate_propagation(&mut self) {
        self.immediate_propagation_stopped = true;
        self.propagation_stopped = true;
    }

    /// Mark the default action as prevented.
    ///
    /// Rejected with a logged warning when invoked from a passive listener.
    pub fn prevent_default(&mut self) {
        if self.passive {
            tracing::warn!(
                event_type = %self.event_type,
                "unable to prevent_default inside passive event listener invocation"
            );
            return;
        }
        self.default_prevented = true;
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prevent_default() {
        let mut event = Event::with_init(
            "tap",
            EventInit {
                cancelable: true,
                ..Default::default()
            },
        );
        event.prevent_default();
        assert!(event.default_prevented());
    }

    #[test]
    fn test_passive_prevent_default_is_rejected() {
        let mut event = Event::new("scroll");
        event.passive = true;
        event.prevent_default();
        assert!(!event.default_prevented());
    }

    #[test]
    fn test_stop_immediate_implies_stop() {
        let mut event = Event::new("tap");
        event.stop_immediate_propagation();
        assert!(event.propagation_stopped);
        assert!(event.immediate_propagation_stopped);
    }
}
