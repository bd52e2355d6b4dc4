// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for the history cache

use std::time::Duration;

use crate::config::{env_flag, env_var};

/// History cache policy
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// On a failed or ambiguous remote lookup, report "not published"
    ///
    /// Prefers an occasional duplicate over silently dropping new content.
    /// Turning it off makes lookups fail closed.
    pub fail_open: bool,
    /// Minimum time between two remote key-list writes
    pub flush_debounce: Duration,
    /// Refuse to start when the initial key list cannot be read
    pub strict_startup: bool,
}

impl HistoryConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            fail_open: env_flag("HISTORY_FAIL_OPEN", true),
            flush_debounce: Duration::from_secs(
                env_var("HISTORY_FLUSH_DEBOUNCE_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(10),
            ),
            strict_startup: env_flag("HISTORY_STRICT_STARTUP", false),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.flush_debounce.is_zero() {
            return Err("Flush debounce window must be greater than 0".to_string());
        }
        Ok(())
    }
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            fail_open: true,
            flush_debounce: Duration::from_secs(10),
            strict_startup: false,
        }
    }
}
