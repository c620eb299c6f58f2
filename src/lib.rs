// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! FitTrack: a small personal workout tracker.
//!
//! This crate provides the backend API: account signup and login with
//! cookie sessions, and create/read/update/delete of workout records.

pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use db::{CredentialStore, Stores, WorkoutStore};
use services::{PasswordHasher, SessionManager};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub users: Arc<dyn CredentialStore>,
    pub workouts: Arc<dyn WorkoutStore>,
    pub sessions: SessionManager,
    pub hasher: PasswordHasher,
}

impl AppState {
    /// Wire up state from configuration and already-opened stores.
    pub fn new(config: Config, stores: Stores) -> Self {
        let sessions = SessionManager::from_config(&config);
        let hasher = PasswordHasher::new(config.password_cost);
        Self {
            config,
            users: stores.users,
            workouts: stores.workouts,
            sessions,
            hasher,
        }
    }

    /// The stores as a bundle, e.g. for seeding.
    pub fn stores(&self) -> Stores {
        Stores {
            users: self.users.clone(),
            workouts: self.workouts.clone(),
        }
    }
}
