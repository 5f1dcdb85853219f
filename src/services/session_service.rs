use tracing::info;
use uuid::Uuid;

use crate::{
    dto::session::{LoginRequest, SessionView},
    error::ServiceError,
    state::{SharedState, session::PlayerSession},
};

/// Register the player's identity, reusing the caller's session when it is still alive.
///
/// Returns the session id to store in the cookie alongside the rendered session.
pub fn login(
    state: &SharedState,
    session_id: Option<Uuid>,
    request: &LoginRequest,
) -> Result<(Uuid, SessionView), ServiceError> {
    let id = session_id
        .filter(|id| state.session_mut(*id).is_some())
        .unwrap_or_else(|| state.open_session());
    let sessions = state.session_count();
    let mut session = state
        .session_mut(id)
        .ok_or_else(|| ServiceError::NotFound("session expired".into()))?;

    let identity = session.login(&request.class, &request.name)?;
    info!(
        session = %id,
        class = %identity.class,
        name = %identity.name,
        sessions,
        "player logged in"
    );

    Ok((id, render(state, &session)))
}

/// Render the caller's session; callers without a live session see an anonymous one.
pub fn current(state: &SharedState, session_id: Option<Uuid>) -> SessionView {
    match session_id.and_then(|id| state.session_mut(id)) {
        Some(session) => render(state, &session),
        None => render(state, &PlayerSession::new(state.config().rules.clone())),
    }
}

/// Render a session with the configured rules.
pub fn render(state: &SharedState, session: &PlayerSession) -> SessionView {
    SessionView::new(
        session,
        &state.catalog().grid_problems,
        state.config().rules.max_attempts,
    )
}
