//! Database layer: store traits with Firestore and in-memory backends.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreDb;
pub use memory::{InMemoryCredentialStore, InMemoryWorkoutStore};

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::error::AppError;
use crate::models::{
    NewWorkout, Projection, User, UserId, Workout, WorkoutField, WorkoutFilter, WorkoutId,
    WorkoutPatch, WorkoutView,
};

/// Collection names as constants.
pub mod collections {
    /// Users, keyed by URL-encoded email
    pub const USERS: &str = "users";
    pub const WORKOUTS: &str = "workouts";
}

/// Persistence for registered users.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up a user by exact email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError>;

    /// Register a user. Fails with [`AppError::DuplicateEmail`] if the email is taken.
    async fn insert_user(&self, email: &str, password_hash: &str) -> Result<User, AppError>;
}

/// Persistence for workout records.
#[async_trait]
pub trait WorkoutStore: Send + Sync {
    /// Filtered, optionally sorted (ascending) and projected listing.
    async fn find(
        &self,
        filter: &WorkoutFilter,
        sort: Option<WorkoutField>,
        projection: &Projection,
    ) -> Result<Vec<WorkoutView>, AppError>;

    async fn find_by_id(&self, id: &WorkoutId) -> Result<Option<Workout>, AppError>;

    /// Store a new workout owned by `owner`, returning its id.
    async fn insert(&self, workout: NewWorkout, owner: &UserId) -> Result<WorkoutId, AppError>;

    /// Merge `patch` into the record. Returns the number of records updated (0 or 1).
    async fn update_by_id(&self, id: &WorkoutId, patch: &WorkoutPatch) -> Result<u64, AppError>;

    /// Returns the number of records deleted (0 or 1).
    async fn delete_by_id(&self, id: &WorkoutId) -> Result<u64, AppError>;
}

/// Handles to both stores, sharing one backend.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn CredentialStore>,
    pub workouts: Arc<dyn WorkoutStore>,
}

impl Stores {
    /// Fresh in-memory stores.
    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(InMemoryCredentialStore::new()),
            workouts: Arc::new(InMemoryWorkoutStore::new()),
        }
    }

    /// Build the stores for the configured backend.
    ///
    /// Firestore connects lazily on first use, so this never blocks on the network.
    pub fn open(config: &DatabaseConfig) -> Self {
        match config {
            DatabaseConfig::Memory => {
                tracing::warn!("Using in-memory storage; data will not survive a restart");
                Self::in_memory()
            }
            DatabaseConfig::Firestore { project_id } => {
                let db = Arc::new(FirestoreDb::new(project_id));
                Self {
                    users: db.clone(),
                    workouts: db,
                }
            }
        }
    }
}
