// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Danbooru source
//!
//! Keys are `danbooru_<post id>`. Video and archive posts are skipped.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::config::DanbooruConfig;
use super::http::{build_client, fetch_bytes, fetch_json};
use super::types::{hashtags, CandidateStub, SourceError};
use super::CandidateSource;

pub const SOURCE_TAG: &str = "danbooru";

const SKIPPED_EXTENSIONS: [&str; 4] = ["mp4", "webm", "zip", "swf"];

#[derive(Debug, Clone, Deserialize)]
pub struct DanbooruPost {
    pub id: u64,
    #[serde(default)]
    pub image_width: u32,
    #[serde(default)]
    pub image_height: u32,
    #[serde(default)]
    pub tag_string: String,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub large_file_url: Option<String>,
    #[serde(default)]
    pub file_ext: String,
}

impl DanbooruPost {
    /// Posts without files or with non-image payloads are not publishable
    pub fn is_publishable(&self) -> bool {
        let has_files = self.file_url.as_deref().is_some_and(|u| !u.is_empty())
            && self.large_file_url.as_deref().is_some_and(|u| !u.is_empty());
        let ext = self.file_ext.to_lowercase();
        has_files && !SKIPPED_EXTENSIONS.contains(&ext.as_str())
    }

    pub fn to_stub(&self) -> Option<CandidateStub> {
        if !self.is_publishable() {
            return None;
        }
        Some(CandidateStub {
            key: format!("danbooru_{}", self.id),
            source_tag: SOURCE_TAG.to_string(),
            download_url: self.file_url.clone()?,
            width: self.image_width,
            height: self.image_height,
            caption: format!("Danbooru: {}\nTags: {}", self.id, hashtags(&self.tag_string)),
            tags: self.tag_string.clone(),
        })
    }
}

pub struct DanbooruSource {
    client: Client,
    config: DanbooruConfig,
}

impl DanbooruSource {
    pub fn new(config: DanbooruConfig) -> Result<Self, SourceError> {
        let client = build_client(config.timeout_secs)?;
        if config.credentials().is_some() {
            info!("Danbooru API key enabled");
        } else {
            warn!("Danbooru API key missing, requests may be blocked");
        }
        Ok(Self { client, config })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match self.config.credentials() {
            Some((user, key)) => request.basic_auth(user, Some(key)),
            None => request,
        }
    }
}

#[async_trait]
impl CandidateSource for DanbooruSource {
    fn name(&self) -> &'static str {
        SOURCE_TAG
    }

    fn interval(&self) -> Duration {
        self.config.interval
    }

    async fn discover(&self) -> Result<Vec<CandidateStub>, SourceError> {
        let url = format!("{}/posts.json", self.config.api_base.trim_end_matches('/'));
        let request = self.authorized(self.client.get(url).query(&[
            ("limit", self.config.limit.to_string()),
            ("tags", self.config.tags.clone()),
        ]));

        let posts: Vec<DanbooruPost> = fetch_json(request, self.config.timeout_secs).await?;
        let stubs: Vec<CandidateStub> = posts.iter().filter_map(DanbooruPost::to_stub).collect();
        debug!(
            "Danbooru discovered {} candidates from {} posts",
            stubs.len(),
            posts.len()
        );
        Ok(stubs)
    }

    async fn download(&self, stub: &CandidateStub) -> Result<Bytes, SourceError> {
        let request = self.authorized(self.client.get(&stub.download_url));
        fetch_bytes(request, self.config.timeout_secs).await
    }
}
