// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! yande.re source
//!
//! Keys are `yande_<post id>`. Posts that belong to a parent set are
//! expanded into the whole set so a set is published together.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};

use super::config::YandeConfig;
use super::http::{build_client, fetch_bytes, fetch_json};
use super::types::{hashtags, CandidateStub, SourceError};
use super::{CandidateSource, PostLookup};

pub const SOURCE_TAG: &str = "yande";

#[derive(Debug, Clone, Deserialize)]
pub struct YandePost {
    pub id: u64,
    #[serde(default)]
    pub parent_id: Option<u64>,
    #[serde(default)]
    pub sample_url: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

/// Original file when it is small enough, otherwise the sample
pub fn select_download_url(post: &YandePost, max_file_bytes: u64) -> Option<String> {
    let file_url = post.file_url.clone().filter(|u| !u.is_empty());
    let sample_url = post.sample_url.clone().filter(|u| !u.is_empty());

    match post.file_size {
        Some(size) if size > 0 && size < max_file_bytes => file_url.or(sample_url),
        _ => sample_url.or(file_url),
    }
}

pub struct YandeSource {
    client: Client,
    config: YandeConfig,
}

impl YandeSource {
    pub fn new(config: YandeConfig) -> Result<Self, SourceError> {
        let client = build_client(config.timeout_secs)?;
        info!("Yande source configured (limit {}, tags {:?})", config.limit, config.tags);
        Ok(Self { client, config })
    }

    async fn query(&self, limit: Option<u32>, tags: &str) -> Result<Vec<YandePost>, SourceError> {
        let url = format!("{}/post.json", self.config.api_base.trim_end_matches('/'));
        let mut request = self.client.get(url).query(&[("tags", tags)]);
        if let Some(limit) = limit {
            request = request.query(&[("limit", limit)]);
        }
        fetch_json(request, self.config.timeout_secs).await
    }

    async fn family(&self, root: u64) -> Vec<YandePost> {
        match self.query(None, &format!("parent:{}", root)).await {
            Ok(posts) => posts,
            Err(e) => {
                debug!("Yande family lookup for {} failed: {}", root, e);
                Vec::new()
            }
        }
    }

    fn single_stub(&self, post: &YandePost) -> Option<CandidateStub> {
        let download_url = select_download_url(post, self.config.max_file_bytes)?;
        Some(CandidateStub {
            key: format!("yande_{}", post.id),
            source_tag: SOURCE_TAG.to_string(),
            download_url,
            width: post.width,
            height: post.height,
            caption: format!("Yande: {}\nTags: {}", post.id, hashtags(&post.tags)),
            tags: post.tags.clone(),
        })
    }

    fn set_stubs(&self, root: u64, family: &[YandePost]) -> Vec<CandidateStub> {
        let total = family.len();
        family
            .iter()
            .take(self.config.max_family)
            .enumerate()
            .filter_map(|(i, post)| {
                let mut stub = self.single_stub(post)?;
                let first_tag = post.tags.split_whitespace().next().unwrap_or("");
                stub.caption = format!(
                    "Yande Set: {} [{}/{}]\nTags: #{}",
                    root,
                    i + 1,
                    total,
                    first_tag
                );
                Some(stub)
            })
            .collect()
    }
}

#[async_trait]
impl CandidateSource for YandeSource {
    fn name(&self) -> &'static str {
        SOURCE_TAG
    }

    fn interval(&self) -> Duration {
        self.config.interval
    }

    async fn discover(&self) -> Result<Vec<CandidateStub>, SourceError> {
        let posts = self.query(Some(self.config.limit), &self.config.tags).await?;
        let mut seen = HashSet::new();
        let mut stubs = Vec::new();

        for post in &posts {
            if !seen.insert(post.id) {
                continue;
            }

            let family = if self.config.follow_family {
                let root = post.parent_id.filter(|p| *p != 0).unwrap_or(post.id);
                let family = self.family(root).await;
                if family.len() > 1 {
                    seen.extend(family.iter().map(|p| p.id));
                    stubs.extend(self.set_stubs(root, &family));
                    continue;
                }
                family
            } else {
                Vec::new()
            };

            let single = family.first().unwrap_or(post);
            seen.insert(single.id);
            stubs.extend(self.single_stub(single));
        }

        debug!("Yande discovered {} candidates from {} posts", stubs.len(), posts.len());
        Ok(stubs)
    }

    async fn download(&self, stub: &CandidateStub) -> Result<Bytes, SourceError> {
        fetch_bytes(self.client.get(&stub.download_url), self.config.timeout_secs).await
    }
}

#[async_trait]
impl PostLookup for YandeSource {
    fn key_for(&self, post_id: u64) -> String {
        format!("yande_{}", post_id)
    }

    async fn lookup(&self, post_id: u64) -> Result<Option<CandidateStub>, SourceError> {
        let posts = self.query(Some(1), &format!("id:{}", post_id)).await?;
        Ok(posts
            .iter()
            .find(|p| p.id == post_id)
            .and_then(|post| self.link_stub(post)))
    }
}

impl YandeSource {
    /// Stub for a post requested by link, captioned with its size
    fn link_stub(&self, post: &YandePost) -> Option<CandidateStub> {
        let mut stub = self.single_stub(post)?;
        stub.caption = format!(
            "Yande: {}\nSize: {}x{}\nTags: {}",
            post.id,
            post.width,
            post.height,
            hashtags(&post.tags)
        );
        Some(stub)
    }
}
