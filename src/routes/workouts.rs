// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Workout API routes.
//!
//! Reads are public. Create, update and delete sit behind the session
//! middleware applied in routes/mod.rs, and update/delete are limited to the
//! user who created the workout.

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::{
    Intensity, NewWorkout, Projection, Workout, WorkoutField, WorkoutFilter, WorkoutId,
    WorkoutPatch, WorkoutView,
};
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Extension, Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Unauthenticated read routes.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/workouts", get(list_workouts))
        .route("/api/workouts/{id}", get(get_workout))
}

/// Mutating routes; the auth middleware is applied in routes/mod.rs.
pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/workouts", post(create_workout))
        .route(
            "/api/workouts/{id}",
            put(update_workout).delete(delete_workout),
        )
}

// ─── Responses ───────────────────────────────────────────────

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "frontend/generated/")
)]
pub struct WorkoutMessage {
    pub message: String,
}

impl WorkoutMessage {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "frontend/generated/")
)]
pub struct CreatedResponse {
    pub message: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub id: WorkoutId,
}

// ─── Reads ───────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    exercise: Option<String>,
    muscle_group: Option<String>,
    intensity: Option<String>,
    /// Single field to sort ascending by
    sort_by: Option<String>,
    /// Comma-separated projection
    fields: Option<String>,
}

impl ListQuery {
    fn filter(&self) -> Result<WorkoutFilter> {
        let intensity = match self.intensity.as_deref().filter(|v| !v.is_empty()) {
            Some(raw) => Some(Intensity::parse(raw).ok_or_else(|| {
                AppError::BadRequest("Intensity must be Low, Medium, or High".to_string())
            })?),
            None => None,
        };

        Ok(WorkoutFilter {
            exercise: self.exercise.clone().filter(|v| !v.is_empty()),
            muscle_group: self.muscle_group.clone().filter(|v| !v.is_empty()),
            intensity,
            user_id: None,
        })
    }

    fn sort(&self) -> Result<Option<WorkoutField>> {
        self.sort_by
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::parse)
            .transpose()
    }
}

/// List workouts with optional filter, sort and projection.
async fn list_workouts(
    State(state): State<Arc<AppState>>,
    WithRejection(Query(query), _): WithRejection<Query<ListQuery>, AppError>,
) -> Result<Json<Vec<WorkoutView>>> {
    let filter = query.filter()?;
    let sort = query.sort()?;
    let projection = Projection::parse(query.fields.as_deref())?;

    let workouts = state.workouts.find(&filter, sort, &projection).await?;

    tracing::debug!(count = workouts.len(), "Listed workouts");
    Ok(Json(workouts))
}

/// Fetch one workout.
async fn get_workout(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Workout>> {
    let id: WorkoutId = id.parse()?;
    let workout = state
        .workouts
        .find_by_id(&id)
        .await?
        .ok_or_else(workout_not_found)?;

    Ok(Json(workout))
}

// ─── Writes ──────────────────────────────────────────────────

/// Create a workout owned by the caller.
async fn create_workout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    WithRejection(Json(body), _): WithRejection<Json<Map<String, Value>>, AppError>,
) -> Result<(StatusCode, Json<CreatedResponse>)> {
    let workout = NewWorkout::from_json(&body)?;
    let id = state.workouts.insert(workout, &user.user_id).await?;

    tracing::info!(workout_id = %id, user_id = %user.user_id, "Workout created");

    Ok((
        StatusCode::CREATED,
        Json(CreatedResponse {
            message: "Workout created".to_string(),
            id,
        }),
    ))
}

/// Merge the body into an existing workout.
async fn update_workout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
    WithRejection(Json(body), _): WithRejection<Json<Map<String, Value>>, AppError>,
) -> Result<Json<WorkoutMessage>> {
    let id: WorkoutId = id.parse()?;
    let existing = owned_workout(&state, &id, &user).await?;

    let patch = WorkoutPatch::from_json(&body, &existing)?;
    if state.workouts.update_by_id(&id, &patch).await? == 0 {
        // Deleted between the read and the write
        return Err(workout_not_found());
    }

    tracing::info!(workout_id = %id, user_id = %user.user_id, "Workout updated");
    Ok(WorkoutMessage::new("Workout updated"))
}

/// Delete a workout.
async fn delete_workout(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> Result<Json<WorkoutMessage>> {
    let id: WorkoutId = id.parse()?;
    owned_workout(&state, &id, &user).await?;

    if state.workouts.delete_by_id(&id).await? == 0 {
        return Err(workout_not_found());
    }

    tracing::info!(workout_id = %id, user_id = %user.user_id, "Workout deleted");
    Ok(WorkoutMessage::new("Workout deleted"))
}

/// Load a workout the caller is allowed to modify.
async fn owned_workout(state: &AppState, id: &WorkoutId, user: &AuthUser) -> Result<Workout> {
    let workout = state
        .workouts
        .find_by_id(id)
        .await?
        .ok_or_else(workout_not_found)?;

    if workout.user_id != user.user_id {
        tracing::warn!(
            workout_id = %id,
            user_id = %user.user_id,
            "Refusing to modify another user's workout"
        );
        return Err(AppError::Forbidden(
            "Not allowed to modify this workout".to_string(),
        ));
    }

    Ok(workout)
}

fn workout_not_found() -> AppError {
    AppError::NotFound("Workout not found".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_query_filter() {
        let query = ListQuery {
            exercise: Some("Running".to_string()),
            muscle_group: Some(String::new()),
            intensity: Some("High".to_string()),
            ..Default::default()
        };
        let filter = query.filter().unwrap();
        assert_eq!(filter.exercise.as_deref(), Some("Running"));
        assert_eq!(filter.muscle_group, None);
        assert_eq!(filter.intensity, Some(Intensity::High));
    }

    #[test]
    fn test_list_query_rejects_bad_values() {
        let query = ListQuery {
            intensity: Some("Extreme".to_string()),
            ..Default::default()
        };
        assert!(query.filter().is_err());

        let query = ListQuery {
            sort_by: Some("passwordHash".to_string()),
            ..Default::default()
        };
        assert!(query.sort().is_err());
    }

    #[test]
    fn test_list_query_sort() {
        let query = ListQuery {
            sort_by: Some("calories".to_string()),
            ..Default::default()
        };
        assert_eq!(query.sort().unwrap(), Some(WorkoutField::Calories));
        assert_eq!(ListQuery::default().sort().unwrap(), None);
    }
}
