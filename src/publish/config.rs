// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for the publish pipeline

use std::time::Duration;

use crate::config::env_var;

#[derive(Debug, Clone)]
pub struct PublishConfig {
    /// Pause between the preview and original sends
    pub send_interval: Duration,
    /// Caption prefix for the original document; empty sends it uncaptioned
    pub original_caption_prefix: String,
}

impl PublishConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            send_interval: env_var("PUBLISH_SEND_INTERVAL_MS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(Duration::from_millis(1000)),
            original_caption_prefix: env_var("ORIGINAL_CAPTION_PREFIX").unwrap_or_default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.send_interval > Duration::from_secs(60) {
            return Err("Send interval cannot exceed 60 seconds".to_string());
        }
        Ok(())
    }

    /// Caption for the original document sent after a preview
    pub fn original_caption(&self, key: &str) -> String {
        if self.original_caption_prefix.is_empty() {
            String::new()
        } else {
            format!("{}{}", self.original_caption_prefix, key)
        }
    }
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            send_interval: Duration::from_millis(1000),
            original_caption_prefix: String::new(),
        }
    }
}
