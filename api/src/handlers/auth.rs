use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{AppendHeaders, IntoResponse},
    Json,
};

use crate::{
    auth::{cookie, CurrentUser},
    error::AppError,
    models::{LoginRequest, RegisterRequest, User},
    AppState,
};

use super::JsonBody;

pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    let user = state
        .users
        .register(&payload.name, &payload.email, &payload.password)
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .users
        .verify_credentials(&payload.email, &payload.password)
        .await?;

    let session = state.sessions.issue(&user.id)?;
    let cookie = cookie::session_cookie(
        &session.token,
        state.sessions.ttl().num_seconds(),
        state.sessions.cookie_secure(),
    )?;

    tracing::info!(user_id = %user.id, "user logged in");
    Ok((AppendHeaders([(header::SET_COOKIE, cookie)]), Json(user)))
}

pub async fn logout(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    state.sessions.revoke(&current.session).await?;
    let cookie = cookie::clear_session_cookie(state.sessions.cookie_secure())?;

    Ok((StatusCode::NO_CONTENT, AppendHeaders([(header::SET_COOKIE, cookie)])))
}
