// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Account and session routes: signup, login, logout, status.

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::session_user;
use crate::services::SESSION_COOKIE;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
        .route("/auth/status", get(status))
}

/// Email/password body shared by signup and login. Both fields are optional
/// here so a missing field gets our own message rather than a decode error.
#[derive(Deserialize)]
pub struct CredentialsBody {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

impl CredentialsBody {
    /// Both fields, if present and non-empty.
    fn into_parts(self) -> Option<(String, String)> {
        let email = self.email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty())?;
        let password = self.password.filter(|p| !p.is_empty())?;
        Some((email, password))
    }
}

#[derive(Validate)]
struct SignupRequest {
    #[validate(email(message = "Invalid email address"))]
    email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    password: String,
}

impl SignupRequest {
    /// First validation failure, checking email before password.
    fn check(&self) -> Result<()> {
        let Err(errors) = self.validate() else {
            return Ok(());
        };
        let field_errors = errors.field_errors();
        let message = ["email", "password"]
            .iter()
            .filter_map(|field| field_errors.get(*field))
            .flat_map(|errs| errs.iter())
            .find_map(|err| err.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| "Invalid signup request".to_string());
        Err(AppError::BadRequest(message))
    }
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Register a new account.
async fn signup(
    State(state): State<Arc<AppState>>,
    WithRejection(Json(body), _): WithRejection<Json<CredentialsBody>, AppError>,
) -> Result<(StatusCode, Json<MessageResponse>)> {
    let (email, password) = body
        .into_parts()
        .ok_or_else(|| AppError::BadRequest("Email and password required".to_string()))?;

    let request = SignupRequest { email, password };
    request.check()?;

    // Cheap pre-check; the store's keyed insert is what actually guarantees uniqueness
    if state.users.find_by_email(&request.email).await?.is_some() {
        return Err(AppError::DuplicateEmail);
    }

    let hash = state.hasher.hash(&request.password).await?;
    let user = state.users.insert_user(&request.email, &hash).await?;

    tracing::info!(user_id = %user.id, "User created");

    Ok((
        StatusCode::CREATED,
        MessageResponse::new("User created successfully"),
    ))
}

/// Check credentials and start a session.
async fn login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    WithRejection(Json(body), _): WithRejection<Json<CredentialsBody>, AppError>,
) -> Result<(CookieJar, Json<MessageResponse>)> {
    let (email, password) = body.into_parts().ok_or(AppError::InvalidCredentials)?;

    let Some(user) = state.users.find_by_email(&email).await? else {
        state.hasher.verify_decoy(&password).await?;
        tracing::info!("Login failed: unknown account");
        return Err(AppError::InvalidCredentials);
    };

    if !state.hasher.verify(&password, &user.password_hash).await? {
        tracing::info!(user_id = %user.id, "Login failed: wrong password");
        return Err(AppError::InvalidCredentials);
    }

    // A fresh login replaces whatever session this browser held before
    if let Some(previous) = jar.get(SESSION_COOKIE) {
        state.sessions.destroy(previous.value())?;
    }

    let token = state.sessions.create(&user.id, &user.email)?;
    let max_age = time::Duration::try_from(state.sessions.policy().ttl)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid session TTL: {}", e)))?;

    let cookie = Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(state.config.is_production())
        .max_age(max_age);

    tracing::info!(user_id = %user.id, "User logged in");

    Ok((jar.add(cookie), MessageResponse::new("Logged in successfully")))
}

/// End the current session, if any, and clear the cookie.
async fn logout(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<MessageResponse>)> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        state.sessions.destroy(cookie.value())?;
    }

    // Same attributes as at login so the browser matches and drops it
    let removal = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(state.config.is_production())
        .max_age(time::Duration::ZERO);

    Ok((jar.add(removal), MessageResponse::new("Logged out successfully")))
}

/// Report whether the request carries a live session.
async fn status(State(state): State<Arc<AppState>>, jar: CookieJar) -> Json<StatusResponse> {
    match session_user(&state, &jar) {
        Some(user) => Json(StatusResponse {
            authenticated: true,
            email: Some(user.email),
        }),
        None => Json(StatusResponse {
            authenticated: false,
            email: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(email: Option<&str>, password: Option<&str>) -> CredentialsBody {
        CredentialsBody {
            email: email.map(str::to_string),
            password: password.map(str::to_string),
        }
    }

    #[test]
    fn test_into_parts_requires_both_fields() {
        assert!(body(Some("a@example.com"), Some("secret1")).into_parts().is_some());
        assert!(body(None, Some("secret1")).into_parts().is_none());
        assert!(body(Some("a@example.com"), None).into_parts().is_none());
        assert!(body(Some("   "), Some("secret1")).into_parts().is_none());
        assert!(body(Some("a@example.com"), Some("")).into_parts().is_none());
    }

    #[test]
    fn test_signup_request_messages() {
        let bad_email = SignupRequest {
            email: "not-an-email".to_string(),
            password: "x".to_string(),
        };
        assert_eq!(
            bad_email.check().unwrap_err().client_message(),
            "Invalid email address"
        );

        let short_password = SignupRequest {
            email: "a@example.com".to_string(),
            password: "12345".to_string(),
        };
        assert_eq!(
            short_password.check().unwrap_err().client_message(),
            "Password must be at least 6 characters"
        );

        let ok = SignupRequest {
            email: "a@example.com".to_string(),
            password: "123456".to_string(),
        };
        assert!(ok.check().is_ok());
    }
}
