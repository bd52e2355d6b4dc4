// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Candidate sources and the poll loop
//!
//! A source only knows how to discover posts and download one. Keys,
//! dedup and publishing are handled by [`run_source`] through the shared
//! history cache and publish pipeline.

pub mod config;
pub mod danbooru;
pub mod http;
pub mod runner;
pub mod types;
pub mod yande;

use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

pub use config::{DanbooruConfig, SourcesConfig, YandeConfig};
pub use danbooru::DanbooruSource;
pub use runner::{run_cycle, run_source, wait_or_cancel, CycleStats, PollTiming};
pub use types::{hashtags, CandidateStub, SourceError};
pub use yande::YandeSource;

/// A site that produces candidates
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Source name, also the key namespace
    fn name(&self) -> &'static str;

    /// Wait between poll cycles
    fn interval(&self) -> Duration;

    /// List the current candidates, keyed and ready to dedup
    async fn discover(&self) -> Result<Vec<CandidateStub>, SourceError>;

    /// Fetch the image for one candidate
    async fn download(&self, stub: &CandidateStub) -> Result<Bytes, SourceError>;
}

/// A source that can also resolve a single post by id, for links sent to
/// the bot
#[async_trait]
pub trait PostLookup: CandidateSource {
    /// Key a post id would be stored under
    fn key_for(&self, post_id: u64) -> String;

    /// Fetch one post; `None` when the site does not know it
    async fn lookup(&self, post_id: u64) -> Result<Option<CandidateStub>, SourceError>;
}

impl SourcesConfig {
    pub fn timing(&self) -> PollTiming {
        PollTiming {
            item_delay: self.item_delay,
            retry_delay: self.retry_delay,
        }
    }
}
