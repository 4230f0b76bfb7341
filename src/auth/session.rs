//! Signed-in profile state.
//!
//! One `SessionState` is created at startup and shared through app data.
//! Profiles are hydrated from the store, refreshed from the change feed and
//! dropped on sign-out. Revoked token ids are remembered until they expire.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use moka::future::Cache;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use crate::model::employee::Employee;
use crate::store::{ChangeEvent, Collection, LeaveStore, StoreError};

const PROFILE_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Clone)]
pub struct SessionState {
    store: Arc<dyn LeaveStore>,
    profiles: Cache<String, Employee>,
    revoked: Cache<String, ()>,
}

impl SessionState {
    pub fn new(store: Arc<dyn LeaveStore>, capacity: u64, token_ttl: Duration) -> Self {
        Self {
            store,
            profiles: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(PROFILE_TTL)
                .build(),
            revoked: Cache::builder().time_to_live(token_ttl).build(),
        }
    }

    /// Cached profile, falling through to the store on a miss.
    pub async fn profile(&self, uid: &str) -> Result<Option<Employee>, StoreError> {
        if let Some(profile) = self.profiles.get(uid).await {
            return Ok(Some(profile));
        }

        let profile = self.store.get_employee(uid).await?;
        if let Some(profile) = &profile {
            self.profiles.insert(uid.to_string(), profile.clone()).await;
        }
        Ok(profile)
    }

    pub async fn remember(&self, profile: Employee) {
        self.profiles.insert(profile.uid.clone(), profile).await;
    }

    pub async fn invalidate(&self, uid: &str) {
        self.profiles.invalidate(uid).await;
    }

    pub async fn revoke(&self, jti: &str) {
        self.revoked.insert(jti.to_string(), ()).await;
    }

    pub async fn is_revoked(&self, jti: &str) -> bool {
        self.revoked.contains_key(jti)
    }

    /// Loads every profile into the cache in batches.
    pub async fn hydrate(&self, batch_size: usize) -> Result<usize> {
        let employees = self.store.list_employees().await?;
        let total = employees.len();

        for batch in employees.chunks(batch_size.max(1)) {
            let inserts: Vec<_> = batch
                .iter()
                .map(|e| self.profiles.insert(e.uid.clone(), e.clone()))
                .collect();
            futures::future::join_all(inserts).await;
        }

        log::info!("Profile cache warmup complete: {} profiles", total);
        Ok(total)
    }

    /// Subscribes to store changes. Take the receiver before [`hydrate`]
    /// so writes committed during the warm-up are still seen.
    ///
    /// [`hydrate`]: SessionState::hydrate
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.store.changes()
    }

    /// Keeps cached profiles in step with committed `users` writes. Runs
    /// until the store's change channel closes.
    pub async fn follow_changes(self, mut changes: broadcast::Receiver<ChangeEvent>) {
        loop {
            match changes.recv().await {
                Ok(event) if event.collection == Collection::Users => {
                    self.refresh(&event.id).await;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Profile sync lagged; clearing profile cache");
                    self.profiles.invalidate_all();
                }
                Err(RecvError::Closed) => break,
            }
        }
        info!("Profile sync stopped");
    }

    async fn refresh(&self, uid: &str) {
        match self.store.get_employee(uid).await {
            Ok(Some(profile)) => self.remember(profile).await,
            Ok(None) => self.invalidate(uid).await,
            Err(e) => {
                debug!(error = %e, uid, "Profile refresh failed; dropping cached copy");
                self.invalidate(uid).await;
            }
        }
    }
}
