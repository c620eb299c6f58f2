// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Workout model, request parsing and the fixed field schema.
//!
//! Client-supplied field names (sort keys, projections, update bodies) are
//! only ever resolved through [`WorkoutField`], so nothing outside this
//! schema can be addressed in storage.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::AppError;
use crate::models::user::UserId;

/// Store-generated workout identifier (a UUID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkoutId(uuid::Uuid);

impl WorkoutId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl FromStr for WorkoutId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| AppError::InvalidId)
    }
}

impl fmt::Display for WorkoutId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

/// Perceived effort of a workout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Intensity {
    Low,
    Medium,
    High,
}

impl Intensity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intensity::Low => "Low",
            Intensity::Medium => "Medium",
            Intensity::High => "High",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Low" => Some(Intensity::Low),
            "Medium" => Some(Intensity::Medium),
            "High" => Some(Intensity::High),
            _ => None,
        }
    }
}

/// Every addressable workout field, named as it appears on the wire and in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkoutField {
    Id,
    Exercise,
    MuscleGroup,
    Duration,
    Calories,
    Intensity,
    Date,
    Notes,
    UserId,
    CreatedAt,
    UpdatedAt,
}

impl WorkoutField {
    pub const ALL: [WorkoutField; 11] = [
        WorkoutField::Id,
        WorkoutField::Exercise,
        WorkoutField::MuscleGroup,
        WorkoutField::Duration,
        WorkoutField::Calories,
        WorkoutField::Intensity,
        WorkoutField::Date,
        WorkoutField::Notes,
        WorkoutField::UserId,
        WorkoutField::CreatedAt,
        WorkoutField::UpdatedAt,
    ];

    /// Fields a create request must supply.
    pub const REQUIRED: [WorkoutField; 6] = [
        WorkoutField::Exercise,
        WorkoutField::Duration,
        WorkoutField::Calories,
        WorkoutField::Date,
        WorkoutField::Intensity,
        WorkoutField::MuscleGroup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkoutField::Id => "_id",
            WorkoutField::Exercise => "exercise",
            WorkoutField::MuscleGroup => "muscleGroup",
            WorkoutField::Duration => "duration",
            WorkoutField::Calories => "calories",
            WorkoutField::Intensity => "intensity",
            WorkoutField::Date => "date",
            WorkoutField::Notes => "notes",
            WorkoutField::UserId => "userId",
            WorkoutField::CreatedAt => "createdAt",
            WorkoutField::UpdatedAt => "updatedAt",
        }
    }

    /// Whether clients may change this field after creation.
    pub fn is_editable(&self) -> bool {
        !matches!(
            self,
            WorkoutField::Id
                | WorkoutField::UserId
                | WorkoutField::CreatedAt
                | WorkoutField::UpdatedAt
        )
    }
}

impl FromStr for WorkoutField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // "id" is accepted as an alias for the wire name "_id"
        if s == "id" {
            return Ok(WorkoutField::Id);
        }
        WorkoutField::ALL
            .into_iter()
            .find(|field| field.as_str() == s)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown field: {s}")))
    }
}

/// Stored workout record.
///
/// `duration` and `calories` are held as `f64`; whole values are written
/// back out as integers so `30` round-trips as `30`, not `30.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workout {
    #[serde(rename = "_id")]
    pub id: WorkoutId,
    pub exercise: String,
    pub muscle_group: String,
    /// Minutes, always > 0
    #[serde(serialize_with = "serialize_number")]
    pub duration: f64,
    /// Always >= 0
    #[serde(serialize_with = "serialize_number")]
    pub calories: f64,
    pub intensity: Intensity,
    pub date: NaiveDate,
    #[serde(default)]
    pub notes: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workout {
    /// Build a fresh record; both timestamps are `now`.
    pub fn create(id: WorkoutId, input: NewWorkout, owner: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            exercise: input.exercise,
            muscle_group: input.muscle_group,
            duration: input.duration,
            calories: input.calories,
            intensity: input.intensity,
            date: input.date,
            notes: input.notes,
            user_id: owner,
            created_at: now,
            updated_at: now,
        }
    }

    /// Shallow-merge `patch` into this record and stamp `updated_at`.
    pub fn apply(&mut self, patch: &WorkoutPatch, updated_at: DateTime<Utc>) {
        if let Some(exercise) = &patch.exercise {
            self.exercise = exercise.clone();
        }
        if let Some(muscle_group) = &patch.muscle_group {
            self.muscle_group = muscle_group.clone();
        }
        if let Some(duration) = patch.duration {
            self.duration = duration;
        }
        if let Some(calories) = patch.calories {
            self.calories = calories;
        }
        if let Some(intensity) = patch.intensity {
            self.intensity = intensity;
        }
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(notes) = &patch.notes {
            self.notes = notes.clone();
        }
        self.updated_at = updated_at;
    }

    /// Exact-match check used by stores without native filtering.
    pub fn matches(&self, filter: &WorkoutFilter) -> bool {
        filter.exercise.as_ref().is_none_or(|e| *e == self.exercise)
            && filter
                .muscle_group
                .as_ref()
                .is_none_or(|m| *m == self.muscle_group)
            && filter.intensity.is_none_or(|i| i == self.intensity)
            && filter.user_id.as_ref().is_none_or(|u| *u == self.user_id)
    }

    /// Ascending order on a single field.
    pub fn compare_by(&self, other: &Workout, field: WorkoutField) -> Ordering {
        match field {
            WorkoutField::Id => self.id.to_string().cmp(&other.id.to_string()),
            WorkoutField::Exercise => self.exercise.cmp(&other.exercise),
            WorkoutField::MuscleGroup => self.muscle_group.cmp(&other.muscle_group),
            WorkoutField::Duration => self.duration.total_cmp(&other.duration),
            WorkoutField::Calories => self.calories.total_cmp(&other.calories),
            // Stored as strings, so compare the way a document store would
            WorkoutField::Intensity => self.intensity.as_str().cmp(other.intensity.as_str()),
            WorkoutField::Date => self.date.cmp(&other.date),
            WorkoutField::Notes => self.notes.cmp(&other.notes),
            WorkoutField::UserId => self.user_id.0.cmp(&other.user_id.0),
            WorkoutField::CreatedAt => self.created_at.cmp(&other.created_at),
            WorkoutField::UpdatedAt => self.updated_at.cmp(&other.updated_at),
        }
    }

    /// Restrict the record to the projected fields.
    pub fn project(&self, projection: &Projection) -> WorkoutView {
        let has = |field| projection.includes(field);
        WorkoutView {
            id: Some(self.id),
            exercise: has(WorkoutField::Exercise).then(|| self.exercise.clone()),
            muscle_group: has(WorkoutField::MuscleGroup).then(|| self.muscle_group.clone()),
            duration: has(WorkoutField::Duration).then_some(self.duration),
            calories: has(WorkoutField::Calories).then_some(self.calories),
            intensity: has(WorkoutField::Intensity).then_some(self.intensity),
            date: has(WorkoutField::Date).then_some(self.date),
            notes: has(WorkoutField::Notes).then(|| self.notes.clone()),
            user_id: has(WorkoutField::UserId).then(|| self.user_id.clone()),
            created_at: has(WorkoutField::CreatedAt).then_some(self.created_at),
            updated_at: has(WorkoutField::UpdatedAt).then_some(self.updated_at),
        }
    }

    /// The client-editable fields as a JSON object, used to preview an update.
    fn editable_json(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(
            WorkoutField::Exercise.as_str().to_string(),
            Value::from(self.exercise.clone()),
        );
        map.insert(
            WorkoutField::MuscleGroup.as_str().to_string(),
            Value::from(self.muscle_group.clone()),
        );
        map.insert(
            WorkoutField::Duration.as_str().to_string(),
            Value::from(self.duration),
        );
        map.insert(
            WorkoutField::Calories.as_str().to_string(),
            Value::from(self.calories),
        );
        map.insert(
            WorkoutField::Intensity.as_str().to_string(),
            Value::from(self.intensity.as_str()),
        );
        map.insert(
            WorkoutField::Date.as_str().to_string(),
            Value::from(self.date.format("%Y-%m-%d").to_string()),
        );
        map.insert(
            WorkoutField::Notes.as_str().to_string(),
            Value::from(self.notes.clone()),
        );
        map
    }
}

/// A workout as returned by list queries: only projected fields are present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkoutView {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<WorkoutId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exercise: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub muscle_group: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_optional_number"
    )]
    pub duration: Option<f64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_optional_number"
    )]
    pub calories: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intensity: Option<Intensity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Exact-match list filter; `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkoutFilter {
    pub exercise: Option<String>,
    pub muscle_group: Option<String>,
    pub intensity: Option<Intensity>,
    pub user_id: Option<UserId>,
}

/// Fields to return from a list query. Empty means every field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection(Vec<WorkoutField>);

impl Projection {
    /// Parse a comma-separated field list such as `exercise,duration`.
    pub fn parse(raw: Option<&str>) -> Result<Self, AppError> {
        let mut fields = Vec::new();
        for name in raw.unwrap_or_default().split(',').map(str::trim) {
            if name.is_empty() {
                continue;
            }
            let field: WorkoutField = name.parse()?;
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
        Ok(Self(fields))
    }

    pub fn is_all(&self) -> bool {
        self.0.is_empty()
    }

    /// The id is always part of the result.
    pub fn includes(&self, field: WorkoutField) -> bool {
        field == WorkoutField::Id || self.is_all() || self.0.contains(&field)
    }

    /// Storage field paths to read, including the id.
    pub fn field_paths(&self) -> Vec<&'static str> {
        WorkoutField::ALL
            .into_iter()
            .filter(|field| self.includes(*field))
            .map(|field| field.as_str())
            .collect()
    }
}

/// Validated input for a new workout.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWorkout {
    pub exercise: String,
    pub muscle_group: String,
    pub duration: f64,
    pub calories: f64,
    pub intensity: Intensity,
    pub date: NaiveDate,
    pub notes: String,
}

impl NewWorkout {
    /// Validate a create request body. The first violated rule is reported.
    pub fn from_json(body: &Map<String, Value>) -> Result<Self, AppError> {
        let get = |field: WorkoutField| body.get(field.as_str());

        if WorkoutField::REQUIRED
            .into_iter()
            .any(|field| is_missing(get(field)))
        {
            return Err(AppError::BadRequest("Missing required fields".to_string()));
        }

        let duration = get(WorkoutField::Duration)
            .and_then(Value::as_f64)
            .filter(|d| d.is_finite() && *d > 0.0)
            .ok_or_else(|| bad_request("Duration must be positive number"))?;

        let calories = get(WorkoutField::Calories)
            .and_then(Value::as_f64)
            .filter(|c| c.is_finite() && *c >= 0.0)
            .ok_or_else(|| bad_request("Calories must be non-negative number"))?;

        let intensity = get(WorkoutField::Intensity)
            .and_then(Value::as_str)
            .and_then(Intensity::parse)
            .ok_or_else(|| bad_request("Intensity must be Low, Medium, or High"))?;

        let exercise = get(WorkoutField::Exercise)
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .ok_or_else(|| bad_request("Exercise must be a string"))?;

        let muscle_group = get(WorkoutField::MuscleGroup)
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .ok_or_else(|| bad_request("Muscle group must be a string"))?;

        let date = get(WorkoutField::Date)
            .and_then(Value::as_str)
            .and_then(parse_calendar_date)
            .ok_or_else(|| bad_request("Date must be a valid calendar date (YYYY-MM-DD)"))?;

        let notes = match get(WorkoutField::Notes) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(notes)) => notes.trim().to_string(),
            Some(_) => return Err(bad_request("Notes must be a string")),
        };

        Ok(Self {
            exercise,
            muscle_group,
            duration,
            calories,
            intensity,
            date,
            notes,
        })
    }
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkoutPatch {
    pub exercise: Option<String>,
    pub muscle_group: Option<String>,
    pub duration: Option<f64>,
    pub calories: Option<f64>,
    pub intensity: Option<Intensity>,
    pub date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl WorkoutPatch {
    /// Storage paths of the fields this patch sets, plus `updatedAt`.
    pub fn field_paths(&self) -> Vec<&'static str> {
        [
            (WorkoutField::Exercise, self.exercise.is_some()),
            (WorkoutField::MuscleGroup, self.muscle_group.is_some()),
            (WorkoutField::Duration, self.duration.is_some()),
            (WorkoutField::Calories, self.calories.is_some()),
            (WorkoutField::Intensity, self.intensity.is_some()),
            (WorkoutField::Date, self.date.is_some()),
            (WorkoutField::Notes, self.notes.is_some()),
            (WorkoutField::UpdatedAt, true),
        ]
        .into_iter()
        .filter(|(_, set)| *set)
        .map(|(field, _)| field.as_str())
        .collect()
    }

    /// Validate an update body against `existing`.
    ///
    /// Only editable fields may appear in the body, and the merged record
    /// must satisfy the same rules as a newly created workout.
    pub fn from_json(body: &Map<String, Value>, existing: &Workout) -> Result<Self, AppError> {
        for key in body.keys() {
            let field: WorkoutField = key.parse()?;
            if !field.is_editable() {
                return Err(AppError::BadRequest(format!(
                    "Field '{key}' cannot be updated"
                )));
            }
        }

        let mut merged = existing.editable_json();
        merged.extend(body.iter().map(|(k, v)| (k.clone(), v.clone())));
        let valid = NewWorkout::from_json(&merged)?;

        let given = |field: WorkoutField| body.contains_key(field.as_str());
        Ok(Self {
            exercise: given(WorkoutField::Exercise).then_some(valid.exercise),
            muscle_group: given(WorkoutField::MuscleGroup).then_some(valid.muscle_group),
            duration: given(WorkoutField::Duration).then_some(valid.duration),
            calories: given(WorkoutField::Calories).then_some(valid.calories),
            intensity: given(WorkoutField::Intensity).then_some(valid.intensity),
            date: given(WorkoutField::Date).then_some(valid.date),
            notes: given(WorkoutField::Notes).then_some(valid.notes),
        })
    }
}

// Largest magnitude below which every integer is exact in an f64
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

fn serialize_number<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    if value.fract() == 0.0 && value.abs() < MAX_EXACT_INTEGER {
        serializer.serialize_i64(*value as i64)
    } else {
        serializer.serialize_f64(*value)
    }
}

fn serialize_optional_number<S: Serializer>(
    value: &Option<f64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(value) => serialize_number(value, serializer),
        None => serializer.serialize_none(),
    }
}

fn bad_request(message: &str) -> AppError {
    AppError::BadRequest(message.to_string())
}

fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(_) => false,
    }
}

/// Accept `YYYY-MM-DD` or a full RFC 3339 timestamp (its local date is kept).
fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|dt| dt.date_naive())
    })
}
