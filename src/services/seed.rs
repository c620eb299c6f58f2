// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Demo account and sample workouts for local development.

use chrono::NaiveDate;
use futures_util::{stream, StreamExt, TryStreamExt};

use crate::db::Stores;
use crate::error::{AppError, Result};
use crate::models::{Intensity, NewWorkout};
use crate::services::PasswordHasher;

pub const DEMO_EMAIL: &str = "test@example.com";
pub const DEMO_PASSWORD: &str = "password123";

const MAX_CONCURRENT_INSERTS: usize = 8;

// (exercise, duration, calories, date, intensity, muscle group, notes)
type SampleWorkout = (&'static str, f64, f64, &'static str, Intensity, &'static str, &'static str);

const SAMPLE_WORKOUTS: [SampleWorkout; 22] = [
    ("Running", 30.0, 300.0, "2024-02-10", Intensity::High, "Legs", "Morning jog at the park"),
    ("Bench Press", 45.0, 350.0, "2024-02-11", Intensity::High, "Chest", "3 sets of 8 reps"),
    ("Swimming", 60.0, 500.0, "2024-02-11", Intensity::Medium, "Full Body", "Freestyle and backstroke"),
    ("Cycling", 40.0, 400.0, "2024-02-12", Intensity::Medium, "Legs", "Mountain biking trail"),
    ("Yoga", 50.0, 200.0, "2024-02-12", Intensity::Low, "Full Body", "Relaxing evening session"),
    ("Squats", 35.0, 320.0, "2024-02-13", Intensity::High, "Legs", "4 sets of 10 reps"),
    ("Pull-ups", 25.0, 250.0, "2024-02-13", Intensity::High, "Back", "5 sets max reps"),
    ("Jump Rope", 20.0, 280.0, "2024-02-13", Intensity::High, "Full Body", "Cardio warm-up"),
    ("Deadlift", 40.0, 400.0, "2024-02-14", Intensity::High, "Back", "5 sets of 5 reps"),
    ("Pilates", 45.0, 240.0, "2024-02-14", Intensity::Medium, "Core", "Core strengthening"),
    ("Rowing", 30.0, 350.0, "2024-02-14", Intensity::Medium, "Full Body", "Indoor rowing machine"),
    ("Boxing", 35.0, 420.0, "2024-02-15", Intensity::High, "Full Body", "Heavy bag training"),
    ("Walking", 60.0, 200.0, "2024-02-15", Intensity::Low, "Legs", "Park walk"),
    ("Dumbbell Curls", 30.0, 220.0, "2024-02-15", Intensity::Medium, "Arms", "3 sets of 12 reps"),
    ("Planks", 15.0, 150.0, "2024-02-16", Intensity::High, "Core", "4 sets of 1 minute"),
    ("Elliptical", 35.0, 380.0, "2024-02-16", Intensity::Medium, "Legs", "Steady cardio"),
    ("Kettlebell Swings", 25.0, 310.0, "2024-02-16", Intensity::High, "Full Body", "5 sets of 20 reps"),
    ("Lat Pulldowns", 30.0, 240.0, "2024-02-17", Intensity::Medium, "Back", "3 sets of 10 reps"),
    ("Incline Treadmill", 25.0, 320.0, "2024-02-17", Intensity::High, "Legs", "5% incline"),
    ("Chest Flyes", 25.0, 210.0, "2024-02-17", Intensity::Medium, "Chest", "Cable machine"),
    ("Hiking", 90.0, 600.0, "2024-02-18", Intensity::Medium, "Full Body", "Mountain trail"),
    ("Tricep Dips", 20.0, 240.0, "2024-02-18", Intensity::High, "Arms", "4 sets of 12 reps"),
];

fn sample_workouts() -> Result<Vec<NewWorkout>> {
    SAMPLE_WORKOUTS
        .iter()
        .map(
            |&(exercise, duration, calories, date, intensity, muscle_group, notes)| {
                let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|e| {
                    AppError::Internal(anyhow::anyhow!("Bad sample date {}: {}", date, e))
                })?;
                Ok(NewWorkout {
                    exercise: exercise.to_string(),
                    muscle_group: muscle_group.to_string(),
                    duration,
                    calories,
                    intensity,
                    date,
                    notes: notes.to_string(),
                })
            },
        )
        .collect()
}

/// Create the demo user and its workouts unless the demo user already exists.
///
/// Returns the number of workouts inserted.
pub async fn seed_demo_data(stores: &Stores, hasher: &PasswordHasher) -> Result<usize> {
    if stores.users.find_by_email(DEMO_EMAIL).await?.is_some() {
        tracing::info!(email = DEMO_EMAIL, "Demo data already present, skipping seed");
        return Ok(0);
    }

    let hash = hasher.hash(DEMO_PASSWORD).await?;
    let user = match stores.users.insert_user(DEMO_EMAIL, &hash).await {
        Ok(user) => user,
        // Another instance seeded concurrently
        Err(AppError::DuplicateEmail) => return Ok(0),
        Err(e) => return Err(e),
    };

    let owner = &user.id;
    let ids: Vec<_> = stream::iter(sample_workouts()?)
        .map(|workout| stores.workouts.insert(workout, owner))
        .buffered(MAX_CONCURRENT_INSERTS)
        .try_collect()
        .await?;

    tracing::info!(
        email = DEMO_EMAIL,
        workouts = ids.len(),
        "Seeded demo data"
    );
    Ok(ids.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Projection, WorkoutFilter};

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let stores = Stores::in_memory();
        let hasher = PasswordHasher::new(4);

        assert_eq!(seed_demo_data(&stores, &hasher).await.unwrap(), 22);
        assert_eq!(seed_demo_data(&stores, &hasher).await.unwrap(), 0);

        let all = stores
            .workouts
            .find(&WorkoutFilter::default(), None, &Projection::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 22);

        let user = stores.users.find_by_email(DEMO_EMAIL).await.unwrap().unwrap();
        assert!(hasher.verify(DEMO_PASSWORD, &user.password_hash).await.unwrap());
        assert!(all.iter().all(|w| w.user_id.as_ref() == Some(&user.id)));
    }

    #[test]
    fn test_sample_workouts_are_valid() {
        let workouts = sample_workouts().unwrap();
        assert_eq!(workouts.len(), 22);
        assert!(workouts
            .iter()
            .all(|w| w.duration > 0.0 && w.calories >= 0.0 && !w.exercise.is_empty()));
    }
}
