// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed stores.
//!
//! Provides typed operations for:
//! - Users (document ID is the URL-encoded email, which makes email unique)
//! - Workouts (document ID is the workout id)
//!
//! The client is created on first use and shared by every caller after that.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::OnceCell;

use super::{collections, CredentialStore, WorkoutStore};
use crate::error::AppError;
use crate::models::{
    NewWorkout, Projection, User, UserId, Workout, WorkoutField, WorkoutFilter, WorkoutId,
    WorkoutPatch, WorkoutView,
};
use crate::time_utils::now_after;

/// Firestore database client.
pub struct FirestoreDb {
    project_id: String,
    client: OnceCell<firestore::FirestoreDb>,
}

impl FirestoreDb {
    /// Create a handle for `project_id` without connecting.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub fn new(project_id: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            client: OnceCell::new(),
        }
    }

    /// Connect now instead of on the first request.
    pub async fn connect(project_id: &str) -> Result<Self, AppError> {
        let db = Self::new(project_id);
        db.get_client().await?;
        Ok(db)
    }

    /// Get the client, connecting exactly once even under concurrent first use.
    async fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .get_or_try_init(|| async {
                // If the emulator environment variable is set, use unauthenticated connection
                // to avoid local credential warnings and leakage.
                if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
                    return create_emulator_client(&self.project_id).await;
                }

                let client = firestore::FirestoreDb::new(&self.project_id)
                    .await
                    .map_err(|e| {
                        AppError::Database(format!("Failed to connect to Firestore: {}", e))
                    })?;

                tracing::info!(project = %self.project_id, "Connected to Firestore");
                Ok(client)
            })
            .await
    }

    fn user_doc_id(email: &str) -> String {
        urlencoding::encode(email).into_owned()
    }
}

/// Create a Firestore client for the emulator with unauthenticated access.
async fn create_emulator_client(project_id: &str) -> Result<firestore::FirestoreDb, AppError> {
    tracing::info!("Using unauthenticated connection for Firestore Emulator");

    let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
        Ok(gcloud_sdk::Token {
            token_type: "Bearer".to_string(),
            token: gcloud_sdk::SecretValue::new(
                "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                    .to_string()
                    .into(),
            ),
            expiry: chrono::Utc::now() + chrono::Duration::hours(1),
        })
    });

    let options = firestore::FirestoreDbOptions::new(project_id.to_string());

    let client = firestore::FirestoreDb::with_options_token_source(
        options,
        gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
        gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
    )
    .await
    .map_err(|e| AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e)))?;

    tracing::info!(
        project = project_id,
        "Connected to Firestore (Emulator/Unauthenticated)"
    );

    Ok(client)
}

// ─── User Operations ─────────────────────────────────────────

#[async_trait]
impl CredentialStore for FirestoreDb {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        self.get_client()
            .await?
            .fluent()
            .select()
            .by_id_in(collections::USERS)
            .obj()
            .one(&Self::user_doc_id(email))
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Creating the email-keyed document fails if it already exists, so two
    /// racing signups cannot both succeed.
    async fn insert_user(&self, email: &str, password_hash: &str) -> Result<User, AppError> {
        let user = User {
            id: UserId::generate(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };

        let result: Result<User, _> = self
            .get_client()
            .await?
            .fluent()
            .insert()
            .into(collections::USERS)
            .document_id(Self::user_doc_id(email))
            .object(&user)
            .execute()
            .await;

        match result {
            Ok(_) => Ok(user),
            Err(e) => {
                // Tell a lost race apart from a real failure
                if self.find_by_email(email).await?.is_some() {
                    Err(AppError::DuplicateEmail)
                } else {
                    Err(AppError::Database(e.to_string()))
                }
            }
        }
    }
}

// ─── Workout Operations ─────────────────────────────────────

#[async_trait]
impl WorkoutStore for FirestoreDb {
    async fn find(
        &self,
        filter: &WorkoutFilter,
        sort: Option<WorkoutField>,
        projection: &Projection,
    ) -> Result<Vec<WorkoutView>, AppError> {
        let exercise = filter.exercise.clone();
        let muscle_group = filter.muscle_group.clone();
        let intensity = filter.intensity.map(|i| i.as_str());
        let user_id = filter.user_id.as_ref().map(|u| u.as_str().to_string());

        let query = self
            .get_client()
            .await?
            .fluent()
            .select()
            .fields(projection.field_paths())
            .from(collections::WORKOUTS)
            .filter(move |q| {
                q.for_all([
                    exercise
                        .clone()
                        .and_then(|v| q.field(WorkoutField::Exercise.as_str()).eq(v)),
                    muscle_group
                        .clone()
                        .and_then(|v| q.field(WorkoutField::MuscleGroup.as_str()).eq(v)),
                    intensity.and_then(|v| q.field(WorkoutField::Intensity.as_str()).eq(v)),
                    user_id
                        .clone()
                        .and_then(|v| q.field(WorkoutField::UserId.as_str()).eq(v)),
                ])
            });

        // Equality filters combined with an order on another field need a
        // composite index in Firestore.
        let query = match sort {
            Some(field) => query.order_by([(
                field.as_str(),
                firestore::FirestoreQueryDirection::Ascending,
            )]),
            None => query,
        };

        query
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn find_by_id(&self, id: &WorkoutId) -> Result<Option<Workout>, AppError> {
        self.get_client()
            .await?
            .fluent()
            .select()
            .by_id_in(collections::WORKOUTS)
            .obj()
            .one(&id.to_string())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    async fn insert(&self, workout: NewWorkout, owner: &UserId) -> Result<WorkoutId, AppError> {
        let id = WorkoutId::generate();
        let record = Workout::create(id, workout, owner.clone(), Utc::now());

        let _: () = self
            .get_client()
            .await?
            .fluent()
            .insert()
            .into(collections::WORKOUTS)
            .document_id(id.to_string())
            .object(&record)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        tracing::debug!(workout_id = %id, "Workout stored");
        Ok(id)
    }

    /// Read and write in one transaction, retried when the commit loses a
    /// race with another writer. Only the patched fields plus `updatedAt`
    /// are written.
    async fn update_by_id(&self, id: &WorkoutId, patch: &WorkoutPatch) -> Result<u64, AppError> {
        for attempt in 1..=MAX_TRANSACTION_ATTEMPTS {
            if let Some(count) = self.try_update(id, patch).await? {
                return Ok(count);
            }
            tracing::warn!(workout_id = %id, attempt, "Workout update conflicted, retrying");
        }
        Err(AppError::Database(format!(
            "Update of workout {} kept conflicting",
            id
        )))
    }

    async fn delete_by_id(&self, id: &WorkoutId) -> Result<u64, AppError> {
        for attempt in 1..=MAX_TRANSACTION_ATTEMPTS {
            if let Some(count) = self.try_delete(id).await? {
                return Ok(count);
            }
            tracing::warn!(workout_id = %id, attempt, "Workout delete conflicted, retrying");
        }
        Err(AppError::Database(format!(
            "Delete of workout {} kept conflicting",
            id
        )))
    }
}

const MAX_TRANSACTION_ATTEMPTS: u32 = 5;

impl FirestoreDb {
    /// One update attempt. `None` means the commit failed and may be retried.
    async fn try_update(
        &self,
        id: &WorkoutId,
        patch: &WorkoutPatch,
    ) -> Result<Option<u64>, AppError> {
        let client = self.get_client().await?;
        let doc_id = id.to_string();

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        // Bound to the transaction, so a concurrent write aborts our commit
        let current: Option<Workout> = transaction_client(client, &transaction)
            .fluent()
            .select()
            .by_id_in(collections::WORKOUTS)
            .obj()
            .one(&doc_id)
            .await
            .map_err(|e| {
                AppError::Database(format!("Failed to read workout in transaction: {}", e))
            })?;

        let Some(mut workout) = current else {
            let _ = transaction.rollback().await;
            return Ok(Some(0));
        };

        let stamp = now_after(workout.updated_at);
        workout.apply(patch, stamp);

        client
            .fluent()
            .update()
            .fields(patch.field_paths())
            .in_col(collections::WORKOUTS)
            .document_id(&doc_id)
            .object(&workout)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add workout to transaction: {}", e))
            })?;

        match transaction.commit().await {
            Ok(_) => Ok(Some(1)),
            Err(e) => {
                tracing::debug!(error = %e, "Transaction commit failed");
                Ok(None)
            }
        }
    }

    /// One delete attempt. Of two racing deletes only one commits with the
    /// document present, so only one reports 1.
    async fn try_delete(&self, id: &WorkoutId) -> Result<Option<u64>, AppError> {
        let client = self.get_client().await?;
        let doc_id = id.to_string();

        let mut transaction = client
            .begin_transaction()
            .await
            .map_err(|e| AppError::Database(format!("Failed to begin transaction: {}", e)))?;

        let current: Option<Workout> = transaction_client(client, &transaction)
            .fluent()
            .select()
            .by_id_in(collections::WORKOUTS)
            .obj()
            .one(&doc_id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        if current.is_none() {
            let _ = transaction.rollback().await;
            return Ok(Some(0));
        }

        client
            .fluent()
            .delete()
            .from(collections::WORKOUTS)
            .document_id(&doc_id)
            .add_to_transaction(&mut transaction)
            .map_err(|e| {
                AppError::Database(format!("Failed to add deletion to transaction: {}", e))
            })?;

        match transaction.commit().await {
            Ok(_) => Ok(Some(1)),
            Err(e) => {
                tracing::debug!(error = %e, "Deletion commit failed");
                Ok(None)
            }
        }
    }
}

/// A client whose reads run inside `transaction`.
fn transaction_client(
    client: &firestore::FirestoreDb,
    transaction: &firestore::FirestoreTransaction<'_>,
) -> firestore::FirestoreDb {
    client.clone_with_consistency_selector(firestore::FirestoreConsistencySelector::Transaction(
        transaction.transaction_id().clone(),
    ))
}
