// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for the persistent store backend

use crate::config::env_var;

/// Connection settings for the D1 database and the key-list worker
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Cloudflare account owning the D1 database
    pub account_id: String,
    /// Bearer token for the D1 HTTP API
    pub api_token: String,
    /// D1 database identifier
    pub database_id: String,
    /// Base URL of the worker exposing `/api/get_history` and `/api/update_history`
    pub worker_url: Option<String>,
    /// Timeout applied to every remote call, in seconds
    pub timeout_secs: u64,
}

impl StoreConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            account_id: env_var("CLOUDFLARE_ACCOUNT_ID").unwrap_or_default(),
            api_token: env_var("CLOUDFLARE_API_TOKEN").unwrap_or_default(),
            database_id: env_var("D1_DATABASE_ID").unwrap_or_default(),
            worker_url: env_var("WORKER_URL")
                .map(|u| u.trim_end_matches('/').to_string())
                .filter(|u| !u.is_empty()),
            timeout_secs: env_var("REMOTE_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.account_id.is_empty() || self.database_id.is_empty() {
            return Err("CLOUDFLARE_ACCOUNT_ID and D1_DATABASE_ID are required".to_string());
        }
        if self.api_token.is_empty() {
            return Err("CLOUDFLARE_API_TOKEN is required".to_string());
        }
        if self.timeout_secs == 0 {
            return Err("Remote timeout must be greater than 0".to_string());
        }
        Ok(())
    }

    /// D1 query endpoint for this account and database
    pub fn query_url(&self) -> String {
        format!(
            "https://api.cloudflare.com/client/v4/accounts/{}/d1/database/{}/query",
            self.account_id, self.database_id
        )
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            account_id: String::new(),
            api_token: String::new(),
            database_id: String::new(),
            worker_url: None,
            timeout_secs: 30,
        }
    }
}
