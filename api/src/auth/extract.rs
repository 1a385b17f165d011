//! Request-side session handling: the `CurrentUser` extractors and the
//! rolling-refresh middleware.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::cookie;
use super::session::Claims;
use crate::error::AppError;
use crate::models::User;
use crate::AppState;

/// The authenticated caller. Rejects with `Unauthenticated` when the
/// request has no valid session or the session's user no longer exists.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user: User,
    pub session: Claims,
}

impl CurrentUser {
    pub fn id(&self) -> &str {
        &self.user.id
    }
}

async fn resolve(state: &AppState, headers: &HeaderMap) -> Result<CurrentUser, AppError> {
    let token = cookie::read_session_cookie(headers).ok_or(AppError::Unauthenticated)?;
    let session = state.sessions.verify(&token).await?;
    let user = state.users.find_by_id(&session.sub).await?.ok_or_else(|| {
        tracing::debug!(user_id = %session.sub, "session refers to a missing user");
        AppError::Unauthenticated
    })?;
    Ok(CurrentUser { user, session })
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(current) = parts.extensions.get::<CurrentUser>() {
            return Ok(current.clone());
        }
        resolve(state, &parts.headers).await
    }
}

/// Like `CurrentUser`, but anonymous requests pass through as `None`.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await {
            Ok(current) => Ok(Self(Some(current))),
            Err(AppError::Unauthenticated) => Ok(Self(None)),
            Err(err) => Err(err),
        }
    }
}

/// Verifies the session once per request, hands it to the extractors, and
/// re-issues the cookie when the session is close to expiry. Handlers that
/// set the session cookie themselves (login, logout, account deletion) win.
pub async fn refresh_session(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let current = match resolve(&state, request.headers()).await {
        Ok(current) => current,
        Err(AppError::Unauthenticated) => return next.run(request).await,
        Err(err) => return err.into_response(),
    };

    let renewed = state.sessions.refresh(&current.session).unwrap_or_else(|err| {
        tracing::warn!(error = %err, "session refresh failed");
        None
    });
    request.extensions_mut().insert(current);

    let mut response = next.run(request).await;

    if let Some(renewed) = renewed {
        if !cookie::sets_session_cookie(response.headers()) {
            let max_age = state.sessions.ttl().num_seconds();
            match cookie::session_cookie(&renewed.token, max_age, state.sessions.cookie_secure()) {
                Ok(value) => {
                    response.headers_mut().append(header::SET_COOKIE, value);
                    tracing::debug!(user_id = %renewed.claims.sub, "session refreshed");
                }
                Err(err) => tracing::warn!(error = %err, "could not build refreshed cookie"),
            }
        }
    }

    response
}
