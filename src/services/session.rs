// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Server-side login sessions.
//!
//! A session is `Absent → Active → Destroyed`. The browser only holds a
//! signed token, `<session id>.<hmac>`; the user it belongs to lives in the
//! session table. Each table entry is read and removed under its own shard
//! lock, so a validate racing a destroy sees the session either whole or
//! gone.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use hmac::{Hmac, Mac};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;
use std::time::Duration;
use subtle::ConstantTimeEq;

use crate::config::Config;
use crate::error::AppError;
use crate::models::UserId;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "fittrack_session";

const SESSION_ID_BYTES: usize = 32;

/// Who a valid session belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub user_id: UserId,
    pub email: String,
}

#[derive(Debug, Clone)]
struct Session {
    identity: SessionIdentity,
    expires_at: DateTime<Utc>,
    last_seen_at: DateTime<Utc>,
}

/// Expiry rules applied to every session.
#[derive(Debug, Clone, Copy)]
pub struct SessionPolicy {
    /// Lifetime from login; never extended
    pub ttl: Duration,
    /// Maximum gap between validated requests
    pub idle_timeout: Option<Duration>,
}

impl Session {
    fn is_expired(&self, now: DateTime<Utc>, policy: &SessionPolicy) -> bool {
        if now >= self.expires_at {
            return true;
        }
        match policy.idle_timeout.and_then(|idle| chrono::Duration::from_std(idle).ok()) {
            Some(idle) => now >= self.last_seen_at + idle,
            None => false,
        }
    }
}

/// Issues, validates and destroys sessions.
pub struct SessionManager {
    sessions: DashMap<String, Session>,
    signing_key: Vec<u8>,
    policy: SessionPolicy,
    rng: SystemRandom,
}

impl SessionManager {
    pub fn new(signing_key: &[u8], policy: SessionPolicy) -> Self {
        Self {
            sessions: DashMap::new(),
            signing_key: signing_key.to_vec(),
            policy,
            rng: SystemRandom::new(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.session_secret,
            SessionPolicy {
                ttl: config.session_ttl,
                idle_timeout: config.session_idle_timeout,
            },
        )
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    /// Start a session and return the signed token for the cookie.
    pub fn create(&self, user_id: &UserId, email: &str) -> Result<String, AppError> {
        let mut bytes = [0u8; SESSION_ID_BYTES];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("System RNG failure")))?;
        let session_id = URL_SAFE_NO_PAD.encode(bytes);

        let ttl = chrono::Duration::from_std(self.policy.ttl)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Invalid session TTL: {}", e)))?;
        let now = Utc::now();
        let session = Session {
            identity: SessionIdentity {
                user_id: user_id.clone(),
                email: email.to_string(),
            },
            expires_at: now + ttl,
            last_seen_at: now,
        };

        let token = format!("{}.{}", session_id, self.sign(&session_id)?);
        self.insert(session_id, session)?;

        tracing::debug!(user_id = %user_id, "Session created");
        Ok(token)
    }

    /// Resolve a cookie token to its user. Expired sessions are dropped.
    pub fn validate(&self, token: &str) -> Option<SessionIdentity> {
        let session_id = self.verify_token(token)?;
        let now = Utc::now();

        let mut entry = self.sessions.get_mut(session_id)?;
        if entry.is_expired(now, &self.policy) {
            drop(entry);
            self.sessions
                .remove_if(session_id, |_, session| session.is_expired(now, &self.policy));
            return None;
        }

        // Idle tracking only; the absolute expiry is never pushed back
        entry.last_seen_at = now;
        Some(entry.identity.clone())
    }

    /// End a session. Unknown or already destroyed tokens are a no-op.
    pub fn destroy(&self, token: &str) -> Result<(), AppError> {
        if let Some(session_id) = self.verify_token(token) {
            if self.sessions.remove(session_id).is_some() {
                tracing::debug!("Session destroyed");
            }
        }
        Ok(())
    }

    /// Drop every expired session, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let before = self.sessions.len();
        self.sessions
            .retain(|_, session| !session.is_expired(now, &self.policy));
        before.saturating_sub(self.sessions.len())
    }

    /// Number of live (possibly expired but not yet purged) sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Add a session under a fresh id; an id already in the table is never replaced.
    fn insert(&self, session_id: String, session: Session) -> Result<(), AppError> {
        match self.sessions.entry(session_id) {
            Entry::Occupied(_) => Err(AppError::SessionStore(
                "Session id collision".to_string(),
            )),
            Entry::Vacant(slot) => {
                slot.insert(session);
                Ok(())
            }
        }
    }

    fn sign(&self, session_id: &str) -> Result<String, AppError> {
        let mut mac = HmacSha256::new_from_slice(&self.signing_key)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
        mac.update(session_id.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Check the token signature and return the session id it carries.
    fn verify_token<'a>(&self, token: &'a str) -> Option<&'a str> {
        let (session_id, signature_hex) = token.rsplit_once('.')?;
        let signature = hex::decode(signature_hex).ok()?;

        let mut mac = HmacSha256::new_from_slice(&self.signing_key).ok()?;
        mac.update(session_id.as_bytes());
        let expected = mac.finalize().into_bytes();

        if bool::from(expected.as_slice().ct_eq(signature.as_slice())) {
            Some(session_id)
        } else {
            tracing::warn!("Session cookie signature mismatch");
            None
        }
    }
}
