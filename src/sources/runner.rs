// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Poll loop driving one source
//!
//! Cancellation is checked before every item and during every wait. An item
//! already being published is allowed to finish.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::types::SourceError;
use super::CandidateSource;
use crate::history::HistoryCache;
use crate::publish::{PublishOutcome, PublishPipeline};

/// Delays used by the poll loop
#[derive(Debug, Clone, Copy)]
pub struct PollTiming {
    /// Pause after each published item
    pub item_delay: Duration,
    /// Wait after a failed discovery
    pub retry_delay: Duration,
}

impl Default for PollTiming {
    fn default() -> Self {
        Self {
            item_delay: Duration::from_secs(3),
            retry_delay: Duration::from_secs(60),
        }
    }
}

/// Counts for one poll cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub discovered: usize,
    pub known: usize,
    pub download_failed: usize,
    pub published: usize,
    pub not_published: usize,
    /// The cycle stopped early because of cancellation
    pub cancelled: bool,
}

/// Sleep for `duration` unless cancelled first; `false` means cancelled
pub async fn wait_or_cancel(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

/// Run one discover/publish pass over `source`
pub async fn run_cycle(
    source: &dyn CandidateSource,
    cache: &HistoryCache,
    pipeline: &PublishPipeline,
    item_delay: Duration,
    cancel: &CancellationToken,
) -> Result<CycleStats, SourceError> {
    let stubs = source.discover().await?;
    let mut stats = CycleStats {
        discovered: stubs.len(),
        ..Default::default()
    };

    for stub in stubs {
        if cancel.is_cancelled() {
            stats.cancelled = true;
            break;
        }

        if cache.check_exists(&stub.key).await {
            stats.known += 1;
            continue;
        }

        info!("Downloading {} from {}", stub.key, source.name());
        let bytes = match source.download(&stub).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Download of {} failed: {}", stub.key, e);
                stats.download_failed += 1;
                continue;
            }
        };

        match pipeline.publish(stub.into_item(bytes)).await {
            PublishOutcome::Published(_) => stats.published += 1,
            PublishOutcome::AlreadyPublished => stats.known += 1,
            PublishOutcome::Skipped(_) => stats.not_published += 1,
        }

        if let Err(e) = cache.flush().await {
            warn!("History flush after item failed: {}", e);
        }

        if !wait_or_cancel(cancel, item_delay).await {
            stats.cancelled = true;
            break;
        }
    }

    Ok(stats)
}

/// Poll `source` until `cancel` fires
pub async fn run_source(
    source: Arc<dyn CandidateSource>,
    cache: Arc<HistoryCache>,
    pipeline: Arc<PublishPipeline>,
    timing: PollTiming,
    cancel: CancellationToken,
) {
    info!("Source {} started", source.name());

    while !cancel.is_cancelled() {
        debug!("Checking {}", source.name());
        let wait = match run_cycle(
            source.as_ref(),
            &cache,
            &pipeline,
            timing.item_delay,
            &cancel,
        )
        .await
        {
            Ok(stats) => {
                info!(
                    "{} cycle done: {} discovered, {} published, {} known, {} failed",
                    source.name(),
                    stats.discovered,
                    stats.published,
                    stats.known,
                    stats.download_failed + stats.not_published
                );
                let history = cache.stats().await;
                debug!(
                    "History: {} keys, {} remote lookups ({} unresolved), {} commits, {} flushes",
                    history.local_keys,
                    history.remote_lookups,
                    history.unresolved_lookups,
                    history.commits,
                    history.flushes
                );
                source.interval()
            }
            Err(e) => {
                error!("{} discovery failed: {}", source.name(), e);
                timing.retry_delay
            }
        };

        if !wait_or_cancel(&cancel, wait).await {
            break;
        }
    }

    info!("Source {} stopped", source.name());
}
