// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Publish inputs, outcomes and errors

use bytes::Bytes;
use thiserror::Error;

use crate::channel::{AssetRef, ChannelError};
use crate::store::{HistoryRecord, StoreError};
use crate::transform::TransformError;

/// One discovered image ready to publish
#[derive(Debug, Clone)]
pub struct CandidateItem {
    /// Globally unique, source-namespaced key (e.g. `yande_1234`)
    pub key: String,
    /// Source namespace (e.g. `yande`)
    pub source_tag: String,
    /// Original image bytes as downloaded
    pub image_bytes: Bytes,
    pub width: u32,
    pub height: u32,
    pub caption: String,
    /// Space separated tags
    pub tags: String,
}

/// Assets already held by the channel, committed by the forward session
#[derive(Debug, Clone)]
pub struct StagedPublish {
    pub key: String,
    pub source_tag: String,
    pub caption: String,
    pub tags: String,
    pub preview: AssetRef,
    /// Distinct original, if the operator supplied one
    pub original: Option<AssetRef>,
    pub width: u32,
    pub height: u32,
}

/// Why an item was not published
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Transform failed: {0}")]
    Transform(#[from] TransformError),

    #[error("Preview send failed: {0}")]
    PreviewSend(#[source] ChannelError),

    #[error("Commit of {key} failed: {source}")]
    Commit {
        key: String,
        #[source]
        source: StoreError,
    },
}

/// Result of one publish attempt
#[derive(Debug)]
pub enum PublishOutcome {
    /// Sent and durably committed
    Published(HistoryRecord),
    /// The key was already in the history; nothing was sent
    AlreadyPublished,
    /// Not published; safe to retry on a later cycle
    Skipped(PublishError),
}

impl PublishOutcome {
    pub fn is_published(&self) -> bool {
        matches!(self, PublishOutcome::Published(_))
    }

    pub fn record(&self) -> Option<&HistoryRecord> {
        match self {
            PublishOutcome::Published(record) => Some(record),
            _ => None,
        }
    }
}
