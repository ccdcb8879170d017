//! Dispatch gate - decides whether an event gets a notification at all

use crate::build_event::BuildEvent;
use crate::filter::EventFilter;

/// Gate outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Notify,
    /// The configured filter matched the event
    Filtered,
    /// `_APP_NAME` is absent or empty
    MissingAppName,
}

impl GateDecision {
    pub fn reason(&self) -> &'static str {
        match self {
            GateDecision::Notify => "notify",
            GateDecision::Filtered => "matched filter",
            GateDecision::MissingAppName => "missing _APP_NAME substitution",
        }
    }
}

/// Evaluate the gate
pub fn decide(event: &BuildEvent, filter: Option<&dyn EventFilter>) -> GateDecision {
    if filter.map_or(false, |f| f.apply(event)) {
        return GateDecision::Filtered;
    }
    if event.app_name().is_empty() {
        return GateDecision::MissingAppName;
    }
    GateDecision::Notify
}

pub fn should_notify(event: &BuildEvent, filter: Option<&dyn EventFilter>) -> bool {
    decide(event, filter) == GateDecision::Notify
}
