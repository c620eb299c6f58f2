// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::http::StatusCode;
use axum::response::IntoResponse;
use fittrack::error::AppError;

async fn body_json(err: AppError) -> (StatusCode, serde_json::Value) {
    let response = err.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[test]
fn test_status_codes() {
    assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(AppError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(AppError::DuplicateEmail.status(), StatusCode::BAD_REQUEST);
    assert_eq!(AppError::InvalidId.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        AppError::Forbidden("no".to_string()).status(),
        StatusCode::FORBIDDEN
    );
    assert_eq!(
        AppError::NotFound("gone".to_string()).status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        AppError::Database("down".to_string()).status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn test_duplicate_email_looks_like_bad_credentials() {
    assert_eq!(
        AppError::DuplicateEmail.client_message(),
        AppError::InvalidCredentials.client_message()
    );
}

#[tokio::test]
async fn test_server_errors_hide_detail() {
    for err in [
        AppError::Database("connection refused to 10.0.0.3:8080".to_string()),
        AppError::SessionStore("lock poisoned".to_string()),
        AppError::Internal(anyhow::anyhow!("secret internal detail")),
    ] {
        let (status, body) = body_json(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body, serde_json::json!({"message": "Server error"}));
    }
}

#[tokio::test]
async fn test_client_errors_carry_message() {
    let (status, body) = body_json(AppError::BadRequest("Missing required fields".to_string())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Missing required fields");

    let (status, body) = body_json(AppError::InvalidId).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid ID");
}
