// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Records and errors shared by persistent store backends

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A durably published image, written once per key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRecord {
    /// Globally unique, source-namespaced key
    pub key: String,
    /// Channel reference of the preview asset
    pub preview_ref: String,
    /// Channel reference of the original asset, empty when only the preview was sent
    pub original_ref: String,
    /// Caption the preview was published with
    pub caption: String,
    /// Space separated tags
    pub tags: String,
    /// Source namespace the record came from (e.g. "yande")
    pub source_tag: String,
    /// Width of the source image in pixels
    pub width: u32,
    /// Height of the source image in pixels
    pub height: u32,
    /// Unix timestamp (seconds) of the commit
    pub created_at: i64,
}

impl HistoryRecord {
    /// Tags as stored remotely: the item's tags followed by its source tag
    pub fn stored_tags(&self) -> String {
        format!("{} {}", self.tags, self.source_tag).trim().to_string()
    }
}

/// Answer to a point existence query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Existence {
    /// The store confirmed a row for the key
    Present,
    /// The store confirmed there is no row for the key
    Absent,
    /// The store answered, but the answer was neither a clear hit nor a clear miss
    Indeterminate,
}

/// Result of an insert-if-absent write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new row was written
    Inserted,
    /// A row for the key already existed and was left untouched
    AlreadyPresent,
}

/// Errors returned by persistent store backends
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Store request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Store API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Malformed store response: {0}")]
    Malformed(String),

    #[error("Store not configured: {0}")]
    NotConfigured(String),
}

impl StoreError {
    /// Map a transport error the same way for every remote call
    pub fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            StoreError::Timeout { timeout_secs }
        } else {
            StoreError::Network(err.to_string())
        }
    }
}
