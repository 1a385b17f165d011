use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{AppendHeaders, IntoResponse},
    Json,
};

use crate::{
    auth::{cookie, CurrentUser},
    error::AppError,
    models::{UpdateProfileRequest, User},
    store::ProfilePatch,
    AppState,
};

use super::JsonBody;

pub async fn get_me(current: CurrentUser) -> Json<User> {
    Json(current.user)
}

pub async fn update_me(
    State(state): State<AppState>,
    current: CurrentUser,
    JsonBody(payload): JsonBody<UpdateProfileRequest>,
) -> Result<Json<User>, AppError> {
    let patch = ProfilePatch {
        name: payload.name,
        email: payload.email,
    };
    let user = state.users.update_profile(current.id(), patch).await?;
    Ok(Json(user))
}

pub async fn delete_me(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    state.users.delete_account(current.id()).await?;
    // The account is gone, so the token cannot authenticate either way.
    if let Err(err) = state.sessions.revoke(&current.session).await {
        tracing::warn!(user_id = %current.id(), error = %err, "could not revoke session of deleted account");
    }
    let cookie = cookie::clear_session_cookie(state.sessions.cookie_secure())?;

    Ok((StatusCode::NO_CONTENT, AppendHeaders([(header::SET_COOKIE, cookie)])))
}
