use serde::{Deserialize, Serialize};

/// An event published by the host's main processing loop and delivered to
/// running plugins through the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostEvent {
    /// A session was established for the given account.
    SessionStarted { account: String },
    /// The current session ended.
    SessionEnded,
    /// One host tick. The host publishes these on a fixed cadence.
    Tick { seq: u64 },
    /// The local actor went busy or idle.
    ActivityChanged { active: bool },
    /// The current interaction target changed (`None` = no target).
    TargetChanged { target: Option<String> },
}

/// Discriminant for `HostEvent`, used by plugins to declare which events
/// they want delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SessionStarted,
    SessionEnded,
    Tick,
    ActivityChanged,
    TargetChanged,
}

impl HostEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            HostEvent::SessionStarted { .. } => EventKind::SessionStarted,
            HostEvent::SessionEnded => EventKind::SessionEnded,
            HostEvent::Tick { .. } => EventKind::Tick,
            HostEvent::ActivityChanged { .. } => EventKind::ActivityChanged,
            HostEvent::TargetChanged { .. } => EventKind::TargetChanged,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventKind::SessionStarted => "session_started",
            EventKind::SessionEnded => "session_ended",
            EventKind::Tick => "tick",
            EventKind::ActivityChanged => "activity_changed",
            EventKind::TargetChanged => "target_changed",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kind_projection() {
        let event = HostEvent::Tick { seq: 7 };
        assert_eq!(event.kind(), EventKind::Tick);

        let event = HostEvent::TargetChanged { target: Some("Goblin".into()) };
        assert_eq!(event.kind(), EventKind::TargetChanged);
    }

    #[test]
    fn test_event_serialization() {
        let event = HostEvent::SessionStarted { account: "adam".into() };
        let json = serde_json::to_string(&event).unwrap();
        let back: HostEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind(), EventKind::SessionStarted);
    }

    #[test]
    fn test_event_kind_display() {
        assert_eq!(EventKind::ActivityChanged.to_string(), "activity_changed");
        assert_eq!(EventKind::Tick.to_string(), "tick");
    }
}
