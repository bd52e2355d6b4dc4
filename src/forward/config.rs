// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for the forward session and operator commands

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

use crate::config::{env_var, split_list};

/// Identity of a command sender (a Telegram user id)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperatorId(pub i64);

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct ForwardConfig {
    /// Identities allowed to drive the forward session and issue deletes
    pub operators: Vec<OperatorId>,
    /// Caption title used when the operator gave none
    pub default_title: String,
    /// Source tag stored with manually forwarded records
    pub source_tag: String,
}

impl ForwardConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut operators = Vec::new();
        for raw in env_var("OPERATOR_IDS").map(|v| split_list(&v)).unwrap_or_default() {
            match raw.parse::<i64>() {
                Ok(id) => operators.push(OperatorId(id)),
                Err(_) => warn!("Ignoring invalid operator id {:?}", raw),
            }
        }

        let defaults = Self::default();
        Self {
            operators,
            default_title: env_var("FORWARD_DEFAULT_TITLE").unwrap_or(defaults.default_title),
            source_tag: defaults.source_tag,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.default_title.trim().is_empty() {
            return Err("Default forward title cannot be empty".to_string());
        }
        if self.operators.is_empty() {
            warn!("No operators configured, forward commands will be rejected");
        }
        Ok(())
    }

    pub fn is_operator(&self, operator: OperatorId) -> bool {
        self.operators.contains(&operator)
    }
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self {
            operators: Vec::new(),
            default_title: "MtcACG:TG".to_string(),
            source_tag: "TG-Forward".to_string(),
        }
    }
}
