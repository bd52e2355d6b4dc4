// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Persistent store adapter
//!
//! The history cache only depends on the narrow contract below:
//! - point existence query
//! - insert-if-absent write of a [`HistoryRecord`]
//! - delete by key
//! - bulk read/write of the published key list
//!
//! [`D1Store`] talks to Cloudflare D1 and the key-list worker; [`MockStore`]
//! is an in-memory backend with the same insert-if-absent semantics.

pub mod config;
pub mod d1;
pub mod mock;
pub mod types;

use async_trait::async_trait;

pub use config::StoreConfig;
pub use d1::D1Store;
pub use mock::MockStore;
pub use types::{Existence, HistoryRecord, InsertOutcome, StoreError};

/// Remote store of committed history records
#[async_trait]
pub trait PersistentStore: Send + Sync {
    /// Ask whether a record exists for `key`
    async fn exists(&self, key: &str) -> Result<Existence, StoreError>;

    /// Write `record` unless a record with the same key already exists
    async fn insert_if_absent(&self, record: &HistoryRecord) -> Result<InsertOutcome, StoreError>;

    /// Remove the record for `key`
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Read the full list of published keys
    async fn read_key_list(&self) -> Result<Vec<String>, StoreError>;

    /// Overwrite the remote list of published keys
    async fn write_key_list(&self, keys: &[String]) -> Result<(), StoreError>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}
