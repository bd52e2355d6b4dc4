// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Process configuration assembled from environment variables
//!
//! Every component owns its config struct (`from_env`, `Default`,
//! `validate`); [`RelayConfig`] simply gathers them for the binary.

use std::env;
use thiserror::Error;

use crate::channel::ChannelConfig;
use crate::forward::ForwardConfig;
use crate::history::HistoryConfig;
use crate::intake::IntakeConfig;
use crate::publish::PublishConfig;
use crate::sources::SourcesConfig;
use crate::store::StoreConfig;
use crate::transform::TransformConfig;

/// Configuration errors reported at startup
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid {section} configuration: {reason}")]
    Invalid {
        section: &'static str,
        reason: String,
    },
}

/// Read an environment variable, also accepting the key with `_` written as spaces
pub fn env_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .or_else(|| env::var(key.replace('_', " ")).ok())
}

/// Parse a boolean flag ("true"/"1"/"yes" are true, "false"/"0"/"no" are false)
pub fn env_flag(key: &str, default: bool) -> bool {
    match env_var(key).map(|v| v.trim().to_lowercase()) {
        Some(v) if v == "true" || v == "1" || v == "yes" => true,
        Some(v) if v == "false" || v == "0" || v == "no" => false,
        _ => default,
    }
}

/// Split a comma or newline separated list, dropping blanks
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(|c| c == ',' || c == '\n')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// All component configuration for one relay process
#[derive(Debug, Clone, Default)]
pub struct RelayConfig {
    pub store: StoreConfig,
    pub history: HistoryConfig,
    pub transform: TransformConfig,
    pub channel: ChannelConfig,
    pub publish: PublishConfig,
    pub forward: ForwardConfig,
    pub sources: SourcesConfig,
    pub intake: IntakeConfig,
}

impl RelayConfig {
    /// Load every section from the environment
    pub fn from_env() -> Self {
        Self {
            store: StoreConfig::from_env(),
            history: HistoryConfig::from_env(),
            transform: TransformConfig::from_env(),
            channel: ChannelConfig::from_env(),
            publish: PublishConfig::from_env(),
            forward: ForwardConfig::from_env(),
            sources: SourcesConfig::from_env(),
            intake: IntakeConfig::from_env(),
        }
    }

    /// Validate every section, reporting the first failure
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks: [(&'static str, Result<(), String>); 8] = [
            ("store", self.store.validate()),
            ("history", self.history.validate()),
            ("transform", self.transform.validate()),
            ("channel", self.channel.validate()),
            ("publish", self.publish.validate()),
            ("forward", self.forward.validate()),
            ("sources", self.sources.validate()),
            ("intake", self.intake.validate()),
        ];

        for (section, result) in checks {
            result.map_err(|reason| ConfigError::Invalid { section, reason })?;
        }
        Ok(())
    }
}
