//! In-process store for single-use password-reset tokens.
//!
//! An owned struct the caller constructs once and shares behind an `Arc` —
//! explicit `new`, no global state.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use salastech_core::Id;

const RESET_TOKEN_TTL: Duration = Duration::hours(1);

struct Entry {
    user_id: Id,
    expires_at: DateTime<Utc>,
}

/// Holds outstanding password-reset tokens in memory. Entries are single-use:
/// `consume` removes the entry whether or not it was still valid.
pub struct TokenStore {
    tokens: Mutex<HashMap<String, Entry>>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self { tokens: Mutex::new(HashMap::new()) }
    }

    /// Issue a new reset token for `user_id`, valid for one hour.
    pub fn issue(&self, user_id: Id) -> String {
        let token = Id::new_v4().to_string();
        let mut tokens = self.tokens.lock().unwrap();
        tokens.insert(token.clone(), Entry { user_id, expires_at: Utc::now() + RESET_TOKEN_TTL });
        token
    }

    /// Consume a token, returning the user it was issued for if it exists
    /// and has not expired. Always removes the entry.
    pub fn consume(&self, token: &str) -> Option<Id> {
        let mut tokens = self.tokens.lock().unwrap();
        let entry = tokens.remove(token)?;
        if entry.expires_at < Utc::now() {
            return None;
        }
        Some(entry.user_id)
    }

    /// Drop expired entries. Called from the scheduler's housekeeping tick
    /// so the map doesn't grow unbounded with abandoned reset requests.
    pub fn prune_expired(&self) {
        let now = Utc::now();
        let mut tokens = self.tokens.lock().unwrap();
        tokens.retain(|_, entry| entry.expires_at >= now);
    }

    pub fn len(&self) -> usize {
        self.tokens.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::new()
    }
}
