// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Two-phase publish: preview, then original, then commit
//!
//! A failed preview send aborts the item with nothing committed. A failed
//! original send is tolerated and the item is committed preview-only.

use bytes::Bytes;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::config::PublishConfig;
use super::types::{CandidateItem, PublishError, PublishOutcome, StagedPublish};
use crate::channel::{AssetKind, OutgoingAsset, OutputChannel};
use crate::history::HistoryCache;
use crate::store::{HistoryRecord, InsertOutcome};
use crate::transform::{self, extension_for, TransformConfig, TransformError};

/// Publishes candidates to the output channel and records them in the history
pub struct PublishPipeline {
    cache: Arc<HistoryCache>,
    channel: Arc<dyn OutputChannel>,
    transform: TransformConfig,
    config: PublishConfig,
}

impl PublishPipeline {
    pub fn new(
        cache: Arc<HistoryCache>,
        channel: Arc<dyn OutputChannel>,
        transform: TransformConfig,
        config: PublishConfig,
    ) -> Self {
        Self {
            cache,
            channel,
            transform,
            config,
        }
    }

    pub fn cache(&self) -> &Arc<HistoryCache> {
        &self.cache
    }

    /// Publish one discovered item
    ///
    /// Calling this twice for the same key is safe: once the first call has
    /// committed, the second is a no-op.
    pub async fn publish(&self, item: CandidateItem) -> PublishOutcome {
        if self.cache.check_exists(&item.key).await {
            debug!("Skipping {}, already published", item.key);
            return PublishOutcome::AlreadyPublished;
        }

        let extension = extension_for(&item.image_bytes);
        let (preview_bytes, preview_name) = match self.prepare_preview(&item, extension).await {
            Ok(preview) => preview,
            Err(e) => {
                warn!("Skipping {}: {}", item.key, e);
                return PublishOutcome::Skipped(PublishError::Transform(e));
            }
        };

        let preview = OutgoingAsset::upload(
            AssetKind::Photo,
            preview_bytes,
            preview_name,
            item.caption.clone(),
        );
        let preview_ref = match self.channel.send_asset(preview).await {
            Ok(asset) => asset,
            Err(e) => {
                error!("Preview send for {} failed: {}", item.key, e);
                return PublishOutcome::Skipped(PublishError::PreviewSend(e));
            }
        };

        self.pause_between_sends().await;

        let original = OutgoingAsset::upload(
            AssetKind::Document,
            item.image_bytes.clone(),
            format!("{}.{}", item.key, extension),
            self.config.original_caption(&item.key),
        );
        let original_ref = match self.channel.send_asset(original).await {
            Ok(asset) => asset.into_string(),
            Err(e) => {
                warn!(
                    "Original send for {} failed, committing preview only: {}",
                    item.key, e
                );
                String::new()
            }
        };

        let record = HistoryRecord {
            key: item.key,
            preview_ref: preview_ref.into_string(),
            original_ref,
            caption: item.caption,
            tags: item.tags,
            source_tag: item.source_tag,
            width: item.width,
            height: item.height,
            created_at: Utc::now().timestamp(),
        };

        match self.commit(record).await {
            Ok(record) => PublishOutcome::Published(record),
            Err(e) => PublishOutcome::Skipped(e),
        }
    }

    /// Commit assets the channel already holds
    ///
    /// Re-sends the staged preview (and a distinct staged original) under
    /// the page caption, then commits. A key that is already known is
    /// reported as [`PublishOutcome::AlreadyPublished`] without sending.
    pub async fn commit_staged(&self, staged: StagedPublish) -> Result<PublishOutcome, PublishError> {
        if self.cache.check_exists(&staged.key).await {
            debug!("Staged {} already published", staged.key);
            return Ok(PublishOutcome::AlreadyPublished);
        }

        let preview = OutgoingAsset::existing(
            AssetKind::Photo,
            staged.preview.clone(),
            staged.caption.clone(),
        );
        let preview_ref = self.channel.send_asset(preview).await.map_err(|e| {
            error!("Preview send for {} failed: {}", staged.key, e);
            PublishError::PreviewSend(e)
        })?;

        let original_ref = match staged.original {
            Some(original) if original != staged.preview => {
                self.pause_between_sends().await;
                let asset = OutgoingAsset::existing(
                    AssetKind::Document,
                    original,
                    self.config.original_caption(&staged.key),
                );
                match self.channel.send_asset(asset).await {
                    Ok(asset) => asset.into_string(),
                    Err(e) => {
                        warn!(
                            "Original send for {} failed, committing preview only: {}",
                            staged.key, e
                        );
                        String::new()
                    }
                }
            }
            // Preview and original are the same blob
            Some(_) => preview_ref.as_str().to_string(),
            None => String::new(),
        };

        let record = HistoryRecord {
            key: staged.key,
            preview_ref: preview_ref.into_string(),
            original_ref,
            caption: staged.caption,
            tags: staged.tags,
            source_tag: staged.source_tag,
            width: staged.width,
            height: staged.height,
            created_at: Utc::now().timestamp(),
        };

        self.commit(record).await.map(PublishOutcome::Published)
    }

    async fn commit(&self, record: HistoryRecord) -> Result<HistoryRecord, PublishError> {
        match self.cache.commit(&record).await {
            Ok(InsertOutcome::Inserted) => {
                info!("Published {} via {}", record.key, self.channel.name());
                Ok(record)
            }
            Ok(InsertOutcome::AlreadyPresent) => {
                warn!("{} was committed concurrently, record kept", record.key);
                Ok(record)
            }
            Err(e) => {
                error!("Commit of {} failed, not durably published: {}", record.key, e);
                Err(PublishError::Commit {
                    key: record.key,
                    source: e,
                })
            }
        }
    }

    /// Preview bytes and filename, transformed only when over a ceiling
    async fn prepare_preview(
        &self,
        item: &CandidateItem,
        extension: &str,
    ) -> Result<(Bytes, String), TransformError> {
        if !self
            .transform
            .needs_transform(item.image_bytes.len(), item.width, item.height)
        {
            return Ok((item.image_bytes.clone(), format!("{}.{}", item.key, extension)));
        }

        let bytes = item.image_bytes.clone();
        let config = self.transform.clone();
        let output = tokio::task::spawn_blocking(move || transform::transform(&bytes, &config))
            .await
            .map_err(|e| TransformError::Task(e.to_string()))??;

        if output.floor_reached && !output.fits(self.transform.max_bytes) {
            warn!(
                "{} still {} bytes at quality floor {}",
                item.key,
                output.bytes.len(),
                output.quality
            );
        }
        Ok((Bytes::from(output.bytes), format!("{}.jpg", item.key)))
    }

    async fn pause_between_sends(&self) {
        if !self.config.send_interval.is_zero() {
            tokio::time::sleep(self.config.send_interval).await;
        }
    }
}
