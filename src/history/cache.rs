// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Two-tier history of published keys
//!
//! A process-local key set answers most lookups; misses fall through to the
//! persistent store. The store stays the source of truth across restarts,
//! the local set is only an accelerator.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::config::HistoryConfig;
use crate::store::{Existence, HistoryRecord, InsertOutcome, PersistentStore, StoreError};

/// Result of a flush request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// The key list was written remotely
    Written { keys: usize },
    /// A flush already happened (or is in flight) inside the debounce window
    Debounced,
    /// No key list read has succeeded yet, so the local set may be partial
    Unsynced,
}

/// Cache statistics
#[derive(Debug, Clone, Default)]
pub struct HistoryStats {
    /// Keys held locally
    pub local_keys: usize,
    /// Existence queries sent to the store
    pub remote_lookups: u64,
    /// Lookups resolved by the fail-open/fail-closed policy
    pub unresolved_lookups: u64,
    /// Successful commits
    pub commits: u64,
    /// Remote key-list writes
    pub flushes: u64,
}

struct HistoryState {
    keys: HashSet<String>,
    last_flush: Option<Instant>,
    /// A remote key list read has succeeded at least once
    synced: bool,
}

#[derive(Default)]
struct Counters {
    remote_lookups: AtomicU64,
    unresolved_lookups: AtomicU64,
    commits: AtomicU64,
    flushes: AtomicU64,
}

/// Shared record of which keys have been published
///
/// Thread-safe: share across pollers and the forward session via `Arc<HistoryCache>`.
pub struct HistoryCache {
    store: Arc<dyn PersistentStore>,
    state: RwLock<HistoryState>,
    config: HistoryConfig,
    counters: Counters,
}

impl HistoryCache {
    /// Create an empty cache in front of `store`
    pub fn new(store: Arc<dyn PersistentStore>, config: HistoryConfig) -> Self {
        Self {
            store,
            state: RwLock::new(HistoryState {
                keys: HashSet::new(),
                last_flush: None,
                synced: false,
            }),
            config,
            counters: Counters::default(),
        }
    }

    /// Populate the local set from the remote key list
    ///
    /// Must finish before pollers start producing. Returns the number of keys
    /// loaded. A store failure is only an error in strict startup mode;
    /// otherwise the cache starts with whatever it has.
    pub async fn load_initial(&self) -> Result<usize, StoreError> {
        let keys = match self.store.read_key_list().await {
            Ok(keys) => keys,
            Err(e) if self.config.strict_startup => return Err(e),
            Err(e) => {
                warn!(
                    "History sync from {} failed, starting with a partial cache and holding key list pushes: {}",
                    self.store.name(),
                    e
                );
                return Ok(0);
            }
        };

        let mut state = self.state.write().await;
        let loaded = keys.len();
        state.keys.extend(keys);
        state.synced = true;
        info!("Synced {} keys from history ({} held locally)", loaded, state.keys.len());
        Ok(loaded)
    }

    /// Whether `key` has already been published
    ///
    /// Local hits are free. A local miss queries the store; a confirmed hit
    /// is remembered locally. Store errors and ambiguous answers are
    /// resolved by the fail-open policy and never surface to the caller.
    pub async fn check_exists(&self, key: &str) -> bool {
        if self.state.read().await.keys.contains(key) {
            return true;
        }

        self.counters.remote_lookups.fetch_add(1, Ordering::Relaxed);
        match self.store.exists(key).await {
            Ok(Existence::Present) => {
                self.state.write().await.keys.insert(key.to_string());
                debug!("History hit from {} for {}", self.store.name(), key);
                true
            }
            Ok(Existence::Absent) => false,
            Ok(Existence::Indeterminate) => {
                warn!("Ambiguous existence answer for {}", key);
                self.resolve_unknown(key)
            }
            Err(e) => {
                warn!("History check for {} failed: {}", key, e);
                self.resolve_unknown(key)
            }
        }
    }

    fn resolve_unknown(&self, key: &str) -> bool {
        self.counters.unresolved_lookups.fetch_add(1, Ordering::Relaxed);
        if self.config.fail_open {
            debug!("Failing open for {}", key);
            false
        } else {
            debug!("Failing closed for {}", key);
            true
        }
    }

    /// Durably record a published item
    ///
    /// The key is only added locally once the store accepted the write, so a
    /// failed commit leaves later lookups on the remote path.
    pub async fn commit(&self, record: &HistoryRecord) -> Result<InsertOutcome, StoreError> {
        let outcome = self.store.insert_if_absent(record).await?;
        self.state.write().await.keys.insert(record.key.clone());
        self.counters.commits.fetch_add(1, Ordering::Relaxed);

        if outcome == InsertOutcome::AlreadyPresent {
            debug!("Commit for {} found an existing record", record.key);
        }
        Ok(outcome)
    }

    /// Push the full local key set to the store, at most once per debounce window
    ///
    /// The window is reserved under the write lock before the remote call, so
    /// concurrent callers cannot both pass the check. A failed write releases
    /// the reservation.
    pub async fn flush(&self) -> Result<FlushOutcome, StoreError> {
        self.push_key_list(true).await
    }

    /// Push the full local key set regardless of the debounce window
    ///
    /// Used at shutdown and after operator corrections, where a skipped write
    /// would lose keys. A successful push still starts a new window.
    pub async fn flush_now(&self) -> Result<FlushOutcome, StoreError> {
        self.push_key_list(false).await
    }

    /// Merge the remote key list if no read has succeeded yet
    ///
    /// Returns `false` while the store stays unreadable. The remote list is
    /// overwritten on every push, so a partial local set must not be pushed.
    async fn ensure_synced(&self) -> bool {
        if self.state.read().await.synced {
            return true;
        }

        match self.store.read_key_list().await {
            Ok(keys) => {
                let mut state = self.state.write().await;
                let remote = keys.len();
                state.keys.extend(keys);
                state.synced = true;
                info!(
                    "History re-synced {} remote keys ({} held locally)",
                    remote,
                    state.keys.len()
                );
                true
            }
            Err(e) => {
                warn!("History still unsynced, holding key list push: {}", e);
                false
            }
        }
    }

    async fn push_key_list(&self, debounce: bool) -> Result<FlushOutcome, StoreError> {
        if !self.ensure_synced().await {
            return Ok(FlushOutcome::Unsynced);
        }

        let now = Instant::now();
        let (keys, previous) = {
            let mut state = self.state.write().await;
            if let Some(last) = state.last_flush.filter(|_| debounce) {
                if now.duration_since(last) < self.config.flush_debounce {
                    debug!("History flush debounced");
                    return Ok(FlushOutcome::Debounced);
                }
            }
            let previous = state.last_flush.replace(now);
            let mut keys: Vec<String> = state.keys.iter().cloned().collect();
            keys.sort();
            (keys, previous)
        };

        match self.store.write_key_list(&keys).await {
            Ok(()) => {
                self.counters.flushes.fetch_add(1, Ordering::Relaxed);
                info!(
                    "History updated to {}, remote list replaced with {} keys",
                    self.store.name(),
                    keys.len()
                );
                Ok(FlushOutcome::Written { keys: keys.len() })
            }
            Err(e) => {
                warn!("History push failed: {}", e);
                let mut state = self.state.write().await;
                if state.last_flush == Some(now) {
                    state.last_flush = previous;
                }
                Err(e)
            }
        }
    }

    /// Remove a published record, remotely first and then locally
    pub async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.store.delete(key).await?;
        self.state.write().await.keys.remove(key);
        info!("Removed {} from history", key);
        Ok(())
    }

    /// Whether `key` is known locally, without touching the store
    pub async fn contains_local(&self, key: &str) -> bool {
        self.state.read().await.keys.contains(key)
    }

    /// Number of keys held locally
    pub async fn len(&self) -> usize {
        self.state.read().await.keys.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Get cache statistics
    pub async fn stats(&self) -> HistoryStats {
        HistoryStats {
            local_keys: self.len().await,
            remote_lookups: self.counters.remote_lookups.load(Ordering::Relaxed),
            unresolved_lookups: self.counters.unresolved_lookups.load(Ordering::Relaxed),
            commits: self.counters.commits.load(Ordering::Relaxed),
            flushes: self.counters.flushes.load(Ordering::Relaxed),
        }
    }
}
