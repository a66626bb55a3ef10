//! In-memory login and refresh bookkeeping
//!
//! `PendingStates` remembers the state minted for each login until its
//! callback arrives (single use, TTL, bounded size). `RefreshGuard` keeps at
//! most one refresh in flight per refresh token. Nothing here survives a
//! restart.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Outcome of consuming a callback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pending {
    /// Issued by this gateway, within TTL, not used before.
    Valid,
    /// Issued by this gateway but older than the TTL.
    Expired,
    /// Never issued, or already consumed.
    Unknown,
}

/// States of logins that have started but not yet completed.
///
/// Holds at most `max_entries` states. `/auth/login` is unauthenticated, so
/// once full the oldest pending login is evicted to make room.
#[derive(Clone)]
pub struct PendingStates {
    entries: Arc<Mutex<HashMap<String, Instant>>>,
    ttl: Duration,
    max_entries: usize,
}

impl PendingStates {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    pub async fn insert(&self, state: String) {
        let mut entries = self.entries.lock().await;
        // Lazy cleanup: remove expired entries while holding the lock
        entries.retain(|_, created_at| created_at.elapsed() < self.ttl);
        while entries.len() >= self.max_entries {
            let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, created_at)| **created_at)
                .map(|(key, _)| key.clone())
            else {
                break;
            };
            entries.remove(&oldest);
            debug!(
                max_entries = self.max_entries,
                "pending login limit reached, evicted oldest state"
            );
        }
        entries.insert(state, Instant::now());
    }

    /// Remove `state` and report whether it was still usable. Always removes.
    pub async fn consume(&self, state: &str) -> Pending {
        let created_at = self.entries.lock().await.remove(state);
        match created_at {
            Some(created_at) if created_at.elapsed() < self.ttl => Pending::Valid,
            Some(_) => Pending::Expired,
            None => Pending::Unknown,
        }
    }

    /// Number of unexpired pending logins.
    pub async fn len(&self) -> usize {
        let mut entries = self.entries.lock().await;
        entries.retain(|_, created_at| created_at.elapsed() < self.ttl);
        entries.len()
    }
}

/// Single-flight guard for refresh requests.
#[derive(Clone, Default)]
pub struct RefreshGuard {
    in_flight: Arc<std::sync::Mutex<HashSet<String>>>,
}

impl RefreshGuard {
    /// Claim `refresh_token`, or `None` if a refresh with it is already running.
    pub fn acquire(&self, refresh_token: &str) -> Option<RefreshPermit> {
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if !in_flight.insert(refresh_token.to_string()) {
            return None;
        }
        Some(RefreshPermit {
            refresh_token: refresh_token.to_string(),
            in_flight: self.in_flight.clone(),
        })
    }
}

/// Held for the duration of one refresh; released on drop, including cancellation.
pub struct RefreshPermit {
    refresh_token: String,
    in_flight: Arc<std::sync::Mutex<HashSet<String>>>,
}

impl Drop for RefreshPermit {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.refresh_token);
    }
}
