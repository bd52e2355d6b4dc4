// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Cloudflare D1 backend
//!
//! Records live in the `images` table and are queried through the D1 HTTP
//! query API. The bulk key list is served by a companion worker as a
//! comma-joined plain text body.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::config::StoreConfig;
use super::types::{Existence, HistoryRecord, InsertOutcome, StoreError};
use super::PersistentStore;

const EXISTS_SQL: &str = "SELECT 1 FROM images WHERE id = ? LIMIT 1";
const INSERT_SQL: &str = "INSERT OR IGNORE INTO images (id, file_name, origin_id, caption, artist, tags, created_at, width, height) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)";
const DELETE_SQL: &str = "DELETE FROM images WHERE id = ?";

/// D1-backed persistent store
pub struct D1Store {
    client: Client,
    query_url: String,
    api_token: String,
    worker_url: Option<String>,
    timeout_secs: u64,
}

#[derive(Debug, Serialize)]
struct Statement<'a> {
    sql: &'a str,
    params: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct D1Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    result: Vec<D1Result>,
    #[serde(default)]
    errors: Vec<D1Message>,
}

#[derive(Debug, Deserialize)]
struct D1Result {
    #[serde(default)]
    results: Option<Vec<Value>>,
    #[serde(default)]
    meta: Option<D1Meta>,
}

#[derive(Debug, Deserialize)]
struct D1Meta {
    #[serde(default)]
    changes: u64,
}

#[derive(Debug, Deserialize)]
struct D1Message {
    #[serde(default)]
    message: String,
}

impl D1Store {
    /// Create a new D1 store from configuration
    pub fn new(config: &StoreConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| StoreError::Network(e.to_string()))?;

        Ok(Self {
            client,
            query_url: config.query_url(),
            api_token: config.api_token.clone(),
            worker_url: config.worker_url.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    /// Send one statement and return the raw body of a 2xx response
    async fn query(&self, statement: &Statement<'_>) -> Result<String, StoreError> {
        let response = self
            .client
            .post(&self.query_url)
            .bearer_auth(&self.api_token)
            .json(statement)
            .send()
            .await
            .map_err(|e| StoreError::from_reqwest(e, self.timeout_secs))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::from_reqwest(e, self.timeout_secs))?;

        if !status.is_success() {
            return Err(StoreError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(body)
    }

    async fn execute(&self, statement: Statement<'_>) -> Result<D1Envelope, StoreError> {
        let body = self.query(&statement).await?;
        parse_envelope(&body)
    }

    fn worker_endpoint(&self, path: &str) -> Option<String> {
        self.worker_url.as_ref().map(|base| format!("{}{}", base, path))
    }
}

/// Classify the body of an existence query
///
/// Only a successful response with a non-empty `results` array is a hit and
/// only an explicit empty `results` array is a miss. Everything else is
/// reported as [`Existence::Indeterminate`] for the caller to resolve.
pub fn classify_existence(body: &str) -> Existence {
    let envelope: D1Envelope = match serde_json::from_str(body) {
        Ok(e) => e,
        Err(_) => return Existence::Indeterminate,
    };
    if !envelope.success {
        return Existence::Indeterminate;
    }
    match envelope.result.first().and_then(|r| r.results.as_ref()) {
        Some(rows) if rows.is_empty() => Existence::Absent,
        Some(_) => Existence::Present,
        None => Existence::Indeterminate,
    }
}

/// Parse a write response, turning `success: false` into an API error
fn parse_envelope(body: &str) -> Result<D1Envelope, StoreError> {
    let envelope: D1Envelope =
        serde_json::from_str(body).map_err(|e| StoreError::Malformed(e.to_string()))?;

    if !envelope.success {
        let message = envelope
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(StoreError::Api {
            status: 200,
            message,
        });
    }

    Ok(envelope)
}

/// Split a comma-joined key list, dropping blanks
pub fn parse_key_list(body: &str) -> Vec<String> {
    body.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl PersistentStore for D1Store {
    async fn exists(&self, key: &str) -> Result<Existence, StoreError> {
        let statement = Statement {
            sql: EXISTS_SQL,
            params: vec![Value::from(key)],
        };

        let body = self.query(&statement).await?;
        Ok(classify_existence(&body))
    }

    async fn insert_if_absent(&self, record: &HistoryRecord) -> Result<InsertOutcome, StoreError> {
        let statement = Statement {
            sql: INSERT_SQL,
            params: vec![
                Value::from(record.key.as_str()),
                Value::from(record.preview_ref.as_str()),
                Value::from(record.original_ref.as_str()),
                Value::from(record.caption.as_str()),
                Value::from(record.source_tag.as_str()),
                Value::from(record.stored_tags()),
                Value::from(record.created_at),
                Value::from(record.width),
                Value::from(record.height),
            ],
        };

        let envelope = self.execute(statement).await?;
        let changes = envelope
            .result
            .first()
            .and_then(|r| r.meta.as_ref())
            .map(|m| m.changes);

        match changes {
            Some(0) => {
                debug!("D1 insert ignored, {} already present", record.key);
                Ok(InsertOutcome::AlreadyPresent)
            }
            _ => Ok(InsertOutcome::Inserted),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let statement = Statement {
            sql: DELETE_SQL,
            params: vec![Value::from(key)],
        };
        self.execute(statement).await?;
        Ok(())
    }

    async fn read_key_list(&self) -> Result<Vec<String>, StoreError> {
        let Some(url) = self.worker_endpoint("/api/get_history") else {
            debug!("WORKER_URL not set, skipping key list read");
            return Ok(Vec::new());
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| StoreError::from_reqwest(e, self.timeout_secs))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::from_reqwest(e, self.timeout_secs))?;

        if !status.is_success() {
            return Err(StoreError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(parse_key_list(&body))
    }

    async fn write_key_list(&self, keys: &[String]) -> Result<(), StoreError> {
        let Some(url) = self.worker_endpoint("/api/update_history") else {
            debug!("WORKER_URL not set, skipping key list write");
            return Ok(());
        };

        let response = self
            .client
            .post(url)
            .body(keys.join(","))
            .send()
            .await
            .map_err(|e| StoreError::from_reqwest(e, self.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "d1"
    }
}
