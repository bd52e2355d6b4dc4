// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Candidates discovered by sources, before download

use bytes::Bytes;
use thiserror::Error;

use crate::publish::CandidateItem;

/// A discovered post, keyed but not yet downloaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateStub {
    /// Source-namespaced key, e.g. `danbooru_123`
    pub key: String,
    pub source_tag: String,
    pub download_url: String,
    pub width: u32,
    pub height: u32,
    pub caption: String,
    /// Space separated tags
    pub tags: String,
}

impl CandidateStub {
    /// Attach downloaded bytes
    pub fn into_item(self, image_bytes: Bytes) -> CandidateItem {
        CandidateItem {
            key: self.key,
            source_tag: self.source_tag,
            image_bytes,
            width: self.width,
            height: self.height,
            caption: self.caption,
            tags: self.tags,
        }
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Source request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Source API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse source response: {0}")]
    Parse(String),
}

impl SourceError {
    pub fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            SourceError::Timeout { timeout_secs }
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

/// Render space separated tags as hashtags: `a b` becomes `#a #b`
pub fn hashtags(tags: &str) -> String {
    tags.split_whitespace()
        .map(|t| format!("#{}", t))
        .collect::<Vec<_>>()
        .join(" ")
}
