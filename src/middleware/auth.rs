// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session authentication middleware.

use crate::error::AppError;
use crate::models::UserId;
use crate::services::{SessionIdentity, SESSION_COOKIE};
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;

/// Authenticated user attached to the request by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: UserId,
    pub email: String,
}

impl From<SessionIdentity> for AuthUser {
    fn from(identity: SessionIdentity) -> Self {
        Self {
            user_id: identity.user_id,
            email: identity.email,
        }
    }
}

/// Resolve the session cookie in `jar`, if any, to its user.
pub fn session_user(state: &AppState, jar: &CookieJar) -> Option<AuthUser> {
    let cookie = jar.get(SESSION_COOKIE)?;
    state.sessions.validate(cookie.value()).map(AuthUser::from)
}

/// Middleware that requires a valid session cookie.
///
/// The downstream handler never runs for an unauthenticated request.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_user = session_user(&state, &jar).ok_or(AppError::Unauthorized)?;
    request.extensions_mut().insert(auth_user);

    Ok(next.run(request).await)
}
