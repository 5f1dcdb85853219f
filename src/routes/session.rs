use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::session::{LoginRequest, SessionView},
    error::AppError,
    services::session_service,
    state::SharedState,
};

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "geoquiz_session";

/// Identity and session inspection routes.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/session", get(get_session))
        .route("/session/login", post(login))
}

/// Session id carried by the request, if any.
pub fn session_id(jar: &CookieJar) -> Option<Uuid> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

fn session_cookie(id: Uuid) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

#[utoipa::path(
    post,
    path = "/session/login",
    tag = "session",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in; session cookie set", body = SessionView),
        (status = 400, description = "Class or name missing")
    )
)]
/// Register class and name; any previous progress of this session is dropped.
pub async fn login(
    State(state): State<SharedState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<SessionView>), AppError> {
    payload.validate()?;
    let (id, view) = session_service::login(&state, session_id(&jar), &payload)?;
    Ok((jar.add(session_cookie(id)), Json(view)))
}

#[utoipa::path(
    get,
    path = "/session",
    tag = "session",
    responses((status = 200, description = "Current session", body = SessionView))
)]
/// Return the caller's session, anonymous when no cookie is set.
pub async fn get_session(State(state): State<SharedState>, jar: CookieJar) -> Json<SessionView> {
    Json(session_service::current(&state, session_id(&jar)))
}
