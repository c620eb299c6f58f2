// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod password;
pub mod seed;
pub mod session;

pub use password::PasswordHasher;
pub use seed::seed_demo_data;
pub use session::{SessionIdentity, SessionManager, SessionPolicy, SESSION_COOKIE};
