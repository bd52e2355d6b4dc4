// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Assets sent to the output channel

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Opaque handle the channel returns for a sent asset
///
/// Can be sent again to re-reference the same blob without re-uploading.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetRef(String);

impl AssetRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How the channel should present an asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    /// Inline, recompressed by the channel; used for previews
    Photo,
    /// Sent as a file, byte for byte; used for originals
    Document,
}

/// What to send
#[derive(Debug, Clone)]
pub enum AssetPayload {
    /// Upload new bytes under `filename`
    Upload { bytes: Bytes, filename: String },
    /// Re-send a blob the channel already holds
    Existing(AssetRef),
}

/// One asset ready to be sent
#[derive(Debug, Clone)]
pub struct OutgoingAsset {
    pub kind: AssetKind,
    pub payload: AssetPayload,
    pub caption: String,
}

impl OutgoingAsset {
    pub fn upload(
        kind: AssetKind,
        bytes: impl Into<Bytes>,
        filename: impl Into<String>,
        caption: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            payload: AssetPayload::Upload {
                bytes: bytes.into(),
                filename: filename.into(),
            },
            caption: caption.into(),
        }
    }

    pub fn existing(kind: AssetKind, asset: AssetRef, caption: impl Into<String>) -> Self {
        Self {
            kind,
            payload: AssetPayload::Existing(asset),
            caption: caption.into(),
        }
    }

    /// Payload size in bytes, zero for re-referenced assets
    pub fn upload_len(&self) -> usize {
        match &self.payload {
            AssetPayload::Upload { bytes, .. } => bytes.len(),
            AssetPayload::Existing(_) => 0,
        }
    }
}

/// Errors returned by output channels
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Channel request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Channel rejected asset: {status} - {description}")]
    Rejected { status: u16, description: String },

    #[error("Malformed channel response: {0}")]
    Malformed(String),
}
