// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Deduplication history
//!
//! Tracks which source-namespaced keys have been published:
//! - local key set rebuilt from the store at startup
//! - remote existence check on local miss, failing open by default
//! - commit through insert-if-absent writes
//! - debounced push of the key list back to the store

pub mod cache;
pub mod config;

pub use cache::{FlushOutcome, HistoryCache, HistoryStats};
pub use config::HistoryConfig;
