//! In-memory storage implementations.
//!
//! Used for local development and tests. Each map entry is only touched
//! under its shard lock, which gives the same single-record atomicity a
//! document database provides.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{CredentialStore, WorkoutStore};
use crate::error::AppError;
use crate::models::{
    NewWorkout, Projection, User, UserId, Workout, WorkoutField, WorkoutFilter, WorkoutId,
    WorkoutPatch, WorkoutView,
};
use crate::time_utils::now_after;

/// In-memory user store, keyed by email.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    users: DashMap<String, User>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.users.get(email).map(|user| user.clone()))
    }

    async fn insert_user(&self, email: &str, password_hash: &str) -> Result<User, AppError> {
        match self.users.entry(email.to_string()) {
            Entry::Occupied(_) => Err(AppError::DuplicateEmail),
            Entry::Vacant(slot) => {
                let user = User {
                    id: UserId::generate(),
                    email: email.to_string(),
                    password_hash: password_hash.to_string(),
                    created_at: Utc::now(),
                };
                slot.insert(user.clone());
                Ok(user)
            }
        }
    }
}

/// A record plus its insertion sequence, which defines the unsorted order.
struct StoredWorkout {
    seq: u64,
    workout: Workout,
}

/// In-memory workout store.
#[derive(Default)]
pub struct InMemoryWorkoutStore {
    workouts: DashMap<WorkoutId, StoredWorkout>,
    next_seq: AtomicU64,
}

impl InMemoryWorkoutStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.workouts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workouts.is_empty()
    }
}

#[async_trait]
impl WorkoutStore for InMemoryWorkoutStore {
    async fn find(
        &self,
        filter: &WorkoutFilter,
        sort: Option<WorkoutField>,
        projection: &Projection,
    ) -> Result<Vec<WorkoutView>, AppError> {
        let mut matching: Vec<(u64, Workout)> = self
            .workouts
            .iter()
            .filter(|entry| entry.workout.matches(filter))
            .map(|entry| (entry.seq, entry.workout.clone()))
            .collect();

        matching.sort_by_key(|(seq, _)| *seq);
        if let Some(field) = sort {
            // Stable sort keeps insertion order among equal keys
            matching.sort_by(|(_, a), (_, b)| a.compare_by(b, field));
        }

        Ok(matching
            .iter()
            .map(|(_, workout)| workout.project(projection))
            .collect())
    }

    async fn find_by_id(&self, id: &WorkoutId) -> Result<Option<Workout>, AppError> {
        Ok(self.workouts.get(id).map(|entry| entry.workout.clone()))
    }

    async fn insert(&self, workout: NewWorkout, owner: &UserId) -> Result<WorkoutId, AppError> {
        let id = WorkoutId::generate();
        let record = Workout::create(id, workout, owner.clone(), Utc::now());
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.workouts.insert(
            id,
            StoredWorkout {
                seq,
                workout: record,
            },
        );
        Ok(id)
    }

    async fn update_by_id(&self, id: &WorkoutId, patch: &WorkoutPatch) -> Result<u64, AppError> {
        match self.workouts.get_mut(id) {
            Some(mut entry) => {
                let stamp = now_after(entry.workout.updated_at);
                entry.workout.apply(patch, stamp);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn delete_by_id(&self, id: &WorkoutId) -> Result<u64, AppError> {
        Ok(self.workouts.remove(id).map_or(0, |_| 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Intensity;
    use chrono::NaiveDate;

    fn new_workout(exercise: &str, duration: f64, intensity: Intensity) -> NewWorkout {
        NewWorkout {
            exercise: exercise.to_string(),
            muscle_group: "Legs".to_string(),
            duration,
            calories: 100.0,
            intensity,
            date: NaiveDate::from_ymd_opt(2024, 2, 10).unwrap(),
            notes: String::new(),
        }
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = InMemoryCredentialStore::new();
        store.insert_user("a@example.com", "hash").await.unwrap();

        let err = store.insert_user("a@example.com", "other").await.unwrap_err();
        assert!(matches!(err, AppError::DuplicateEmail));
        assert_eq!(store.len(), 1);

        // Case-sensitive key
        store.insert_user("A@example.com", "hash").await.unwrap();
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_find_keeps_insertion_order_without_sort() {
        let store = InMemoryWorkoutStore::new();
        let owner = UserId::generate();
        for name in ["Yoga", "Boxing", "Cycling"] {
            store
                .insert(new_workout(name, 30.0, Intensity::Low), &owner)
                .await
                .unwrap();
        }

        let all = store
            .find(&WorkoutFilter::default(), None, &Projection::default())
            .await
            .unwrap();
        let names: Vec<_> = all.iter().map(|w| w.exercise.clone().unwrap()).collect();
        assert_eq!(names, vec!["Yoga", "Boxing", "Cycling"]);
    }

    #[tokio::test]
    async fn test_find_filter_sort_projection() {
        let store = InMemoryWorkoutStore::new();
        let owner = UserId::generate();
        store
            .insert(new_workout("Running", 45.0, Intensity::High), &owner)
            .await
            .unwrap();
        store
            .insert(new_workout("Yoga", 50.0, Intensity::Low), &owner)
            .await
            .unwrap();
        store
            .insert(new_workout("Running", 20.0, Intensity::Medium), &owner)
            .await
            .unwrap();

        let filter = WorkoutFilter {
            exercise: Some("Running".to_string()),
            ..Default::default()
        };
        let projection = Projection::parse(Some("duration")).unwrap();
        let runs = store
            .find(&filter, Some(WorkoutField::Duration), &projection)
            .await
            .unwrap();

        assert_eq!(runs.len(), 2);
        assert_eq!(runs[0].duration, Some(20.0));
        assert_eq!(runs[1].duration, Some(45.0));
        assert!(runs[0].id.is_some());
        assert!(runs[0].exercise.is_none());
    }

    #[tokio::test]
    async fn test_update_and_delete_counts() {
        let store = InMemoryWorkoutStore::new();
        let owner = UserId::generate();
        let id = store
            .insert(new_workout("Rowing", 30.0, Intensity::Medium), &owner)
            .await
            .unwrap();

        let patch = WorkoutPatch {
            notes: Some("Indoor".to_string()),
            ..Default::default()
        };
        assert_eq!(store.update_by_id(&id, &patch).await.unwrap(), 1);
        assert_eq!(
            store.update_by_id(&WorkoutId::generate(), &patch).await.unwrap(),
            0
        );

        let updated = store.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(updated.notes, "Indoor");
        assert_eq!(updated.exercise, "Rowing");
        assert!(updated.updated_at > updated.created_at);

        assert_eq!(store.delete_by_id(&id).await.unwrap(), 1);
        assert_eq!(store.delete_by_id(&id).await.unwrap(), 0);
        assert!(store.is_empty());
    }
}
