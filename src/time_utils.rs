// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for timestamps.

use chrono::{DateTime, Duration, Utc};

/// Current time, but strictly after `previous`.
///
/// Keeps `updatedAt` moving forward even when two writes land within the
/// clock's resolution or the wall clock steps backwards.
pub fn now_after(previous: DateTime<Utc>) -> DateTime<Utc> {
    Utc::now().max(previous + Duration::microseconds(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_after_future_timestamp() {
        let future = Utc::now() + Duration::hours(1);
        assert!(now_after(future) > future);
    }

    #[test]
    fn test_now_after_past_timestamp() {
        let past = Utc::now() - Duration::hours(1);
        let stamped = now_after(past);
        assert!(stamped > past + Duration::minutes(59));
    }
}
