// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-memory persistent store with real insert-if-absent semantics
//!
//! Used by tests and local dry runs. Supports error injection, an
//! "unreachable" mode where every call fails, an indeterminate mode for
//! existence queries, optional per-call latency and call counters.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::types::{Existence, HistoryRecord, InsertOutcome, StoreError};
use super::PersistentStore;

/// Per-operation call counts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MockStoreCalls {
    pub exists: usize,
    pub insert: usize,
    pub delete: usize,
    pub read_key_list: usize,
    pub write_key_list: usize,
}

#[derive(Debug, Default)]
struct Counters {
    exists: AtomicUsize,
    insert: AtomicUsize,
    delete: AtomicUsize,
    read_key_list: AtomicUsize,
    write_key_list: AtomicUsize,
    inserted: AtomicUsize,
}

#[derive(Debug, Clone)]
pub struct MockStore {
    records: Arc<Mutex<HashMap<String, HistoryRecord>>>,
    key_list: Arc<Mutex<Vec<String>>>,
    written_lists: Arc<Mutex<Vec<Vec<String>>>>,
    injected_error: Arc<Mutex<Option<StoreError>>>,
    unreachable: Arc<AtomicBool>,
    indeterminate: Arc<AtomicBool>,
    latency: Arc<Mutex<Option<Duration>>>,
    counters: Arc<Counters>,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            key_list: Arc::new(Mutex::new(Vec::new())),
            written_lists: Arc::new(Mutex::new(Vec::new())),
            injected_error: Arc::new(Mutex::new(None)),
            unreachable: Arc::new(AtomicBool::new(false)),
            indeterminate: Arc::new(AtomicBool::new(false)),
            latency: Arc::new(Mutex::new(None)),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Seed the remote key list read by `read_key_list`
    pub async fn seed_key_list<I, S>(&self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = self.key_list.lock().await;
        list.extend(keys.into_iter().map(Into::into));
    }

    /// Seed a record as if it had been committed by an earlier run
    pub async fn seed_record(&self, record: HistoryRecord) {
        self.records.lock().await.insert(record.key.clone(), record);
    }

    /// Fail the next call with `error`
    pub async fn inject_error(&self, error: StoreError) {
        *self.injected_error.lock().await = Some(error);
    }

    /// Make every call fail with a network error until cleared
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Make existence queries return [`Existence::Indeterminate`]
    pub fn set_indeterminate(&self, indeterminate: bool) {
        self.indeterminate.store(indeterminate, Ordering::SeqCst);
    }

    /// Delay every call by `latency`
    pub async fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().await = latency;
    }

    pub async fn record(&self, key: &str) -> Option<HistoryRecord> {
        self.records.lock().await.get(key).cloned()
    }

    pub async fn record_count(&self) -> usize {
        self.records.lock().await.len()
    }

    /// Number of insert calls that actually created a row
    pub fn inserted_count(&self) -> usize {
        self.counters.inserted.load(Ordering::SeqCst)
    }

    /// Key lists written so far, oldest first
    pub async fn written_key_lists(&self) -> Vec<Vec<String>> {
        self.written_lists.lock().await.clone()
    }

    pub fn calls(&self) -> MockStoreCalls {
        MockStoreCalls {
            exists: self.counters.exists.load(Ordering::SeqCst),
            insert: self.counters.insert.load(Ordering::SeqCst),
            delete: self.counters.delete.load(Ordering::SeqCst),
            read_key_list: self.counters.read_key_list.load(Ordering::SeqCst),
            write_key_list: self.counters.write_key_list.load(Ordering::SeqCst),
        }
    }

    async fn before_call(&self) -> Result<(), StoreError> {
        let latency = *self.latency.lock().await;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(StoreError::Network("mock store unreachable".to_string()));
        }
        if let Some(error) = self.injected_error.lock().await.take() {
            return Err(error);
        }
        Ok(())
    }
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PersistentStore for MockStore {
    async fn exists(&self, key: &str) -> Result<Existence, StoreError> {
        self.counters.exists.fetch_add(1, Ordering::SeqCst);
        self.before_call().await?;

        if self.indeterminate.load(Ordering::SeqCst) {
            return Ok(Existence::Indeterminate);
        }

        if self.records.lock().await.contains_key(key) {
            Ok(Existence::Present)
        } else {
            Ok(Existence::Absent)
        }
    }

    async fn insert_if_absent(&self, record: &HistoryRecord) -> Result<InsertOutcome, StoreError> {
        self.counters.insert.fetch_add(1, Ordering::SeqCst);
        self.before_call().await?;

        let mut records = self.records.lock().await;
        if records.contains_key(&record.key) {
            return Ok(InsertOutcome::AlreadyPresent);
        }
        records.insert(record.key.clone(), record.clone());
        self.counters.inserted.fetch_add(1, Ordering::SeqCst);
        Ok(InsertOutcome::Inserted)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.counters.delete.fetch_add(1, Ordering::SeqCst);
        self.before_call().await?;

        self.records.lock().await.remove(key);
        self.key_list.lock().await.retain(|k| k != key);
        Ok(())
    }

    async fn read_key_list(&self) -> Result<Vec<String>, StoreError> {
        self.counters.read_key_list.fetch_add(1, Ordering::SeqCst);
        self.before_call().await?;

        Ok(self.key_list.lock().await.clone())
    }

    async fn write_key_list(&self, keys: &[String]) -> Result<(), StoreError> {
        self.counters.write_key_list.fetch_add(1, Ordering::SeqCst);
        self.before_call().await?;

        *self.key_list.lock().await = keys.to_vec();
        self.written_lists.lock().await.push(keys.to_vec());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
