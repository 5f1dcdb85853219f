use serde::Serialize;
use utoipa::ToSchema;

use crate::state::session::SessionPhase;

/// Session phase exposed to clients.
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisiblePhase {
    /// Not logged in.
    Idle,
    /// Logged in, choosing a game.
    Menu,
    /// A round is running.
    InProgress,
    /// The last round is won or lost.
    Over,
    /// Waiting to go back to the menu after trying to replay a lost game.
    LockedOut,
}

impl From<SessionPhase> for VisiblePhase {
    fn from(value: SessionPhase) -> Self {
        match value {
            SessionPhase::Idle => VisiblePhase::Idle,
            SessionPhase::Menu => VisiblePhase::Menu,
            SessionPhase::InProgress(_) => VisiblePhase::InProgress,
            SessionPhase::Over { .. } => VisiblePhase::Over,
            SessionPhase::LockedOut(_) => VisiblePhase::LockedOut,
        }
    }
}
