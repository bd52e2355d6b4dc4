// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for the Telegram output channel

use tracing::warn;

use crate::config::env_var;

#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Bot API token
    pub bot_token: String,
    /// Target channel chat id
    pub channel_id: i64,
    /// Timeout for a single send, in seconds
    pub timeout_secs: u64,
    /// Bot API base URL (overridable for local Bot API servers)
    pub api_base: String,
}

impl ChannelConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let channel_id = match env_var("CHANNEL_ID").map(|v| v.trim().parse::<i64>()) {
            Some(Ok(id)) => id,
            Some(Err(e)) => {
                warn!("Invalid CHANNEL_ID: {}", e);
                0
            }
            None => 0,
        };

        Self {
            bot_token: env_var("BOT_TOKEN").unwrap_or_default(),
            channel_id,
            timeout_secs: env_var("CHANNEL_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(120),
            api_base: env_var("TELEGRAM_API_BASE")
                .unwrap_or_else(|| "https://api.telegram.org".to_string()),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.bot_token.is_empty() {
            return Err("BOT_TOKEN is missing".to_string());
        }
        if self.channel_id == 0 {
            return Err("CHANNEL_ID is missing or invalid".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("Channel timeout must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            channel_id: 0,
            timeout_secs: 120,
            api_base: "https://api.telegram.org".to_string(),
        }
    }
}
