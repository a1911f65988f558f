//! Session lifecycle states

use serde::Serialize;

/// Lifecycle state of a capture session.
///
/// A session moves `Idle → Capturing → Stopping → Stopped`, or to
/// `Failed` from any non-terminal state on an unrecoverable error.
/// `Stopped` and `Failed` are terminal; a new capture means a new
/// session.
///
/// `Idle` describes a session that has not started streaming yet. The
/// handles returned by [`Kinescope::capture`](crate::Kinescope::capture)
/// are only observable from `Capturing` onward, since starting the
/// stream is part of session construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Capturing,
    Stopping,
    Stopped,
    Failed,
}

impl SessionState {
    /// Whether this state admits no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Stopped | SessionState::Failed)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Capturing => "capturing",
            SessionState::Stopping => "stopping",
            SessionState::Stopped => "stopped",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}
