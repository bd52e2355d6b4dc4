// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for the source pollers

use std::time::Duration;

use crate::config::env_var;

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env_var(key).and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct YandeConfig {
    pub api_base: String,
    /// Posts per poll; zero disables the source
    pub limit: u32,
    pub tags: String,
    pub interval: Duration,
    pub timeout_secs: u64,
    /// Originals at or above this size are fetched as samples instead
    pub max_file_bytes: u64,
    /// Expand posts with a parent into their whole set
    pub follow_family: bool,
    /// Cap on posts taken from one set
    pub max_family: usize,
}

impl YandeConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_base: env_var("YANDE_API_BASE").unwrap_or(defaults.api_base),
            limit: env_parse("YANDE_LIMIT", defaults.limit),
            tags: env_var("YANDE_TAGS").unwrap_or(defaults.tags),
            interval: Duration::from_secs(60 * env_parse("YANDE_INTERVAL_MINS", 180u64)),
            ..defaults
        }
    }

    pub fn enabled(&self) -> bool {
        self.limit > 0
    }
}

impl Default for YandeConfig {
    fn default() -> Self {
        Self {
            api_base: "https://yande.re".to_string(),
            limit: 1,
            tags: "order:random".to_string(),
            interval: Duration::from_secs(180 * 60),
            timeout_secs: 90,
            max_file_bytes: 13 * 1024 * 1024,
            follow_family: true,
            max_family: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DanbooruConfig {
    pub api_base: String,
    pub tags: String,
    /// Posts per poll; zero disables the source
    pub limit: u32,
    pub username: Option<String>,
    pub api_key: Option<String>,
    pub interval: Duration,
    pub timeout_secs: u64,
}

impl DanbooruConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_base: env_var("DANBOORU_API_BASE").unwrap_or(defaults.api_base),
            tags: env_var("DANBOORU_TAGS").unwrap_or_default(),
            limit: env_parse("DANBOORU_LIMIT", defaults.limit),
            username: env_var("DANBOORU_USERNAME").filter(|v| !v.is_empty()),
            api_key: env_var("DANBOORU_API_KEY").filter(|v| !v.is_empty()),
            interval: Duration::from_secs(60 * env_parse("DANBOORU_INTERVAL_MINS", 60u64)),
            timeout_secs: defaults.timeout_secs,
        }
    }

    /// Danbooru only runs with a tag query and a positive limit
    pub fn enabled(&self) -> bool {
        !self.tags.trim().is_empty() && self.limit > 0
    }

    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.api_key) {
            (Some(user), Some(key)) => Some((user.as_str(), key.as_str())),
            _ => None,
        }
    }
}

impl Default for DanbooruConfig {
    fn default() -> Self {
        Self {
            api_base: "https://danbooru.donmai.us".to_string(),
            tags: String::new(),
            limit: 1,
            username: None,
            api_key: None,
            interval: Duration::from_secs(60 * 60),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourcesConfig {
    pub yande: YandeConfig,
    pub danbooru: DanbooruConfig,
    /// Pause after each published item
    pub item_delay: Duration,
    /// Wait after a failed discovery before trying again
    pub retry_delay: Duration,
}

impl SourcesConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            yande: YandeConfig::from_env(),
            danbooru: DanbooruConfig::from_env(),
            item_delay: Duration::from_secs(env_parse("ITEM_DELAY_SECS", 3u64)),
            retry_delay: Duration::from_secs(60),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.yande.enabled() && self.yande.interval.is_zero() {
            return Err("Yande interval must be greater than 0".to_string());
        }
        if self.yande.limit > 100 {
            return Err(format!("Yande limit {} exceeds 100", self.yande.limit));
        }
        if self.danbooru.enabled() && self.danbooru.interval.is_zero() {
            return Err("Danbooru interval must be greater than 0".to_string());
        }
        if self.danbooru.limit > 200 {
            return Err(format!("Danbooru limit {} exceeds 200", self.danbooru.limit));
        }
        if self.danbooru.username.is_some() != self.danbooru.api_key.is_some() {
            return Err("Danbooru username and API key must be set together".to_string());
        }
        Ok(())
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            yande: YandeConfig::default(),
            danbooru: DanbooruConfig::default(),
            item_delay: Duration::from_secs(3),
            retry_delay: Duration::from_secs(60),
        }
    }
}
