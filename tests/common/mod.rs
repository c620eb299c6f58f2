// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use fittrack::config::Config;
use fittrack::db::{FirestoreDb, Stores};
use fittrack::routes::create_router;
use fittrack::AppState;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a test database connection.
#[allow(dead_code)]
pub async fn test_db() -> FirestoreDb {
    FirestoreDb::connect("test-project")
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Create a test app backed by in-memory stores.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app() -> (Router, Arc<AppState>) {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> (Router, Arc<AppState>) {
    let state = Arc::new(AppState::new(config, Stores::in_memory()));
    (create_router(state.clone()), state)
}

/// Build a request with an optional JSON body and session cookie.
#[allow(dead_code)]
pub fn request(method: Method, uri: &str, body: Option<Value>, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Send one request through a clone of the router.
#[allow(dead_code)]
pub async fn send(app: &Router, req: Request<Body>) -> Response {
    app.clone().oneshot(req).await.unwrap()
}

/// Read the response body as JSON.
#[allow(dead_code)]
pub async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// All Set-Cookie header values.
#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}

/// The `name=value` pair to send back for the session cookie, if one was set.
#[allow(dead_code)]
pub fn session_cookie(response: &Response) -> Option<String> {
    set_cookie_headers(response)
        .into_iter()
        .find(|value| value.starts_with("fittrack_session="))
        .and_then(|value| value.split(';').next().map(str::to_string))
}

/// Sign up a user, asserting success.
#[allow(dead_code)]
pub async fn signup(app: &Router, email: &str, password: &str) {
    let response = send(
        app,
        request(
            Method::POST,
            "/auth/signup",
            Some(serde_json::json!({ "email": email, "password": password })),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

/// Log in and return the session cookie pair.
#[allow(dead_code)]
pub async fn login(app: &Router, email: &str, password: &str) -> String {
    let response = send(
        app,
        request(
            Method::POST,
            "/auth/login",
            Some(serde_json::json!({ "email": email, "password": password })),
            None,
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    session_cookie(&response).expect("login should set a session cookie")
}

/// Sign up and log in a fresh user.
#[allow(dead_code)]
pub async fn signup_and_login(app: &Router, email: &str) -> String {
    signup(app, email, "password123").await;
    login(app, email, "password123").await
}

/// The workout used throughout the API tests.
#[allow(dead_code)]
pub fn running_workout() -> Value {
    serde_json::json!({
        "exercise": "Running",
        "duration": 30,
        "calories": 300,
        "date": "2024-02-10",
        "intensity": "High",
        "muscleGroup": "Legs"
    })
}

/// Create a workout and return its id.
#[allow(dead_code)]
pub async fn create_workout(app: &Router, cookie: &str, workout: Value) -> String {
    let response = send(
        app,
        request(Method::POST, "/api/workouts", Some(workout), Some(cookie)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Workout created");
    body["id"].as_str().unwrap().to_string()
}
