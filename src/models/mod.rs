// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod user;
pub mod workout;

pub use user::{User, UserId};
pub use workout::{
    Intensity, NewWorkout, Projection, Workout, WorkoutField, WorkoutFilter, WorkoutId,
    WorkoutPatch, WorkoutView,
};
