// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for the update intake

use std::time::Duration;

use crate::config::{env_flag, env_var};

/// Longest long-poll wait the Bot API accepts
pub const MAX_POLL_TIMEOUT_SECS: u64 = 50;

#[derive(Debug, Clone)]
pub struct IntakeConfig {
    /// Poll for updates at all
    pub enabled: bool,
    /// Long-poll wait per getUpdates call, in seconds
    pub poll_timeout_secs: u64,
    /// Wait after a failed getUpdates call
    pub retry_delay: Duration,
    /// A photo preview waits for a separate original file
    pub expect_original: bool,
}

impl IntakeConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_flag("INTAKE_ENABLED", defaults.enabled),
            poll_timeout_secs: env_var("INTAKE_POLL_TIMEOUT_SECS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.poll_timeout_secs),
            retry_delay: env_var("INTAKE_RETRY_DELAY_SECS")
                .and_then(|v| v.trim().parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.retry_delay),
            expect_original: env_flag("FORWARD_EXPECT_ORIGINAL", defaults.expect_original),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.poll_timeout_secs > MAX_POLL_TIMEOUT_SECS {
            return Err(format!(
                "Intake poll timeout cannot exceed {}s",
                MAX_POLL_TIMEOUT_SECS
            ));
        }
        if self.retry_delay.is_zero() {
            return Err("Intake retry delay must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_timeout_secs: 30,
            retry_delay: Duration::from_secs(5),
            expect_original: true,
        }
    }
}
