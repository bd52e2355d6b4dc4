// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! HTTP helpers shared by the sources

use bytes::Bytes;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::types::SourceError;

/// Browser user agent; some boards block unknown clients
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub fn build_client(timeout_secs: u64) -> Result<Client, SourceError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| SourceError::Network(e.to_string()))
}

/// Send `request` and decode a JSON body, treating non-2xx as an error
pub async fn fetch_json<T: DeserializeOwned>(
    request: RequestBuilder,
    timeout_secs: u64,
) -> Result<T, SourceError> {
    let response = request
        .header("Accept", "application/json")
        .send()
        .await
        .map_err(|e| SourceError::from_reqwest(e, timeout_secs))?;

    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(SourceError::Api {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| SourceError::Parse(e.to_string()))
}

/// Send `request` and return the raw body
pub async fn fetch_bytes(request: RequestBuilder, timeout_secs: u64) -> Result<Bytes, SourceError> {
    let response = request
        .send()
        .await
        .map_err(|e| SourceError::from_reqwest(e, timeout_secs))?;

    let status = response.status();
    if !status.is_success() {
        return Err(SourceError::Api {
            status: status.as_u16(),
            message: format!("download failed for {}", response.url()),
        });
    }

    response
        .bytes()
        .await
        .map_err(|e| SourceError::from_reqwest(e, timeout_secs))
}
