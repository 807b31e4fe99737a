//! Plugin lifecycle state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Current state of a plugin.
///
/// `Terminated` and `Failed` are terminal; a plugin occupies exactly one
/// state at any instant and only moves along the edges checked by
/// [`PluginState::can_transition_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PluginState {
    Idle,
    Starting,
    Running,
    Stopping,
    Terminated,
    Failed,
}

impl PluginState {
    pub fn is_terminal(self) -> bool {
        matches!(self, PluginState::Terminated | PluginState::Failed)
    }

    /// Whether the state machine permits moving from `self` to `next`.
    pub fn can_transition_to(self, next: PluginState) -> bool {
        use PluginState::*;
        matches!(
            (self, next),
            (Idle, Starting)
                | (Starting, Running)
                | (Starting, Failed)
                | (Running, Stopping)
                | (Running, Failed)
                | (Stopping, Terminated)
                | (Stopping, Failed)
        )
    }
}

impl std::fmt::Display for PluginState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PluginState::Idle => "idle",
            PluginState::Starting => "starting",
            PluginState::Running => "running",
            PluginState::Stopping => "stopping",
            PluginState::Terminated => "terminated",
            PluginState::Failed => "failed",
        };
        write!(f, "{}", s)
    }
}

/// One applied state transition, broadcast to lifecycle observers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    pub plugin: String,
    pub from: PluginState,
    pub to: PluginState,
    /// Failure cause when `to` is [`PluginState::Failed`].
    pub cause: Option<String>,
}

/// Which hook produced a plugin failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureKind {
    /// `start_up` errored while the plugin was starting.
    Startup,
    /// An event handler errored while the plugin was running.
    Runtime,
    /// `shut_down` errored while the plugin was stopping.
    Shutdown,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FailureKind::Startup => "startup",
            FailureKind::Runtime => "runtime",
            FailureKind::Shutdown => "shutdown",
        };
        write!(f, "{}", s)
    }
}

/// Recorded cause of a plugin failure, queryable after the fact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    pub kind: FailureKind,
    pub cause: String,
    pub at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_edges() {
        use PluginState::*;
        assert!(Idle.can_transition_to(Starting));
        assert!(Starting.can_transition_to(Running));
        assert!(Starting.can_transition_to(Failed));
        assert!(Running.can_transition_to(Stopping));
        assert!(Running.can_transition_to(Failed));
        assert!(Stopping.can_transition_to(Terminated));
        assert!(Stopping.can_transition_to(Failed));
    }

    #[test]
    fn test_illegal_edges() {
        use PluginState::*;
        assert!(!Idle.can_transition_to(Running));
        assert!(!Running.can_transition_to(Starting));
        assert!(!Terminated.can_transition_to(Starting));
        assert!(!Failed.can_transition_to(Running));
        assert!(!Stopping.can_transition_to(Running));
    }

    #[test]
    fn test_terminal_states() {
        assert!(PluginState::Terminated.is_terminal());
        assert!(PluginState::Failed.is_terminal());
        assert!(!PluginState::Running.is_terminal());
    }
}
