// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-memory output channel that records every send
//!
//! Sends can be failed per asset kind, either once or until cleared.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::types::{AssetKind, AssetPayload, AssetRef, ChannelError, OutgoingAsset};
use super::OutputChannel;

/// One recorded send
#[derive(Debug, Clone)]
pub struct SentAsset {
    pub kind: AssetKind,
    pub caption: String,
    /// Filename for uploads, `None` for re-referenced assets
    pub filename: Option<String>,
    /// Uploaded size, zero for re-referenced assets
    pub size: usize,
    /// Reference re-sent, if any
    pub reused: Option<AssetRef>,
    /// Reference handed back to the caller
    pub asset: AssetRef,
}

#[derive(Debug, Clone)]
pub struct RecordingChannel {
    sent: Arc<Mutex<Vec<SentAsset>>>,
    scripted: Arc<Mutex<VecDeque<(AssetKind, ChannelError)>>>,
    fail_photos: Arc<AtomicBool>,
    fail_documents: Arc<AtomicBool>,
    attempts: Arc<AtomicUsize>,
    next_id: Arc<AtomicUsize>,
}

impl RecordingChannel {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            scripted: Arc::new(Mutex::new(VecDeque::new())),
            fail_photos: Arc::new(AtomicBool::new(false)),
            fail_documents: Arc::new(AtomicBool::new(false)),
            attempts: Arc::new(AtomicUsize::new(0)),
            next_id: Arc::new(AtomicUsize::new(1)),
        }
    }

    /// Fail the next send of `kind` with `error`
    pub async fn fail_next(&self, kind: AssetKind, error: ChannelError) {
        self.scripted.lock().await.push_back((kind, error));
    }

    /// Fail every send of `kind` until cleared
    pub fn set_failing(&self, kind: AssetKind, failing: bool) {
        match kind {
            AssetKind::Photo => self.fail_photos.store(failing, Ordering::SeqCst),
            AssetKind::Document => self.fail_documents.store(failing, Ordering::SeqCst),
        }
    }

    /// Successful sends, oldest first
    pub async fn sent(&self) -> Vec<SentAsset> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_of(&self, kind: AssetKind) -> Vec<SentAsset> {
        self.sent
            .lock()
            .await
            .iter()
            .filter(|s| s.kind == kind)
            .cloned()
            .collect()
    }

    /// Send attempts, failed ones included
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    async fn scripted_failure(&self, kind: AssetKind) -> Option<ChannelError> {
        let mut scripted = self.scripted.lock().await;
        let pos = scripted.iter().position(|(k, _)| *k == kind)?;
        scripted.remove(pos).map(|(_, e)| e)
    }
}

impl Default for RecordingChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OutputChannel for RecordingChannel {
    async fn send_asset(&self, asset: OutgoingAsset) -> Result<AssetRef, ChannelError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if let Some(error) = self.scripted_failure(asset.kind).await {
            return Err(error);
        }
        let failing = match asset.kind {
            AssetKind::Photo => self.fail_photos.load(Ordering::SeqCst),
            AssetKind::Document => self.fail_documents.load(Ordering::SeqCst),
        };
        if failing {
            return Err(ChannelError::Rejected {
                status: 400,
                description: "recording channel set to fail".to_string(),
            });
        }

        let size = asset.upload_len();
        let (filename, reused) = match asset.payload {
            AssetPayload::Upload { filename, .. } => (Some(filename), None),
            AssetPayload::Existing(existing) => (None, Some(existing)),
        };
        // Re-sending an existing blob keeps its reference
        let returned = match &reused {
            Some(existing) => existing.clone(),
            None => {
                let id = self.next_id.fetch_add(1, Ordering::SeqCst);
                let prefix = match asset.kind {
                    AssetKind::Photo => "photo",
                    AssetKind::Document => "doc",
                };
                AssetRef::new(format!("{}-{}", prefix, id))
            }
        };

        self.sent.lock().await.push(SentAsset {
            kind: asset.kind,
            caption: asset.caption,
            filename,
            size,
            reused,
            asset: returned.clone(),
        });

        Ok(returned)
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
