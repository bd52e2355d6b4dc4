// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Bot API client for receiving updates and sending replies

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::config::IntakeConfig;
use super::types::Update;
use super::BotApi;
use crate::channel::telegram::api_failure;
use crate::channel::{ChannelConfig, ChannelError};

/// Only messages are needed
const ALLOWED_UPDATES: &str = r#"["message"]"#;

pub struct TelegramBot {
    client: Client,
    api_base: String,
    bot_token: String,
    timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct UpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<Update>,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<RetryParameters>,
}

#[derive(Debug, Deserialize)]
struct AckResponse {
    ok: bool,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<RetryParameters>,
}

#[derive(Debug, Deserialize)]
struct RetryParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to_message_id: Option<i64>,
}

impl TelegramBot {
    /// The request timeout covers the long-poll wait plus a normal send
    pub fn new(channel: &ChannelConfig, intake: &IntakeConfig) -> Result<Self, ChannelError> {
        let timeout_secs = intake.poll_timeout_secs + channel.timeout_secs;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ChannelError::Network(e.to_string()))?;

        info!(
            "Telegram update intake configured (poll timeout {}s)",
            intake.poll_timeout_secs
        );

        Ok(Self {
            client,
            api_base: channel.api_base.trim_end_matches('/').to_string(),
            bot_token: channel.bot_token.clone(),
            timeout_secs,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    fn map_transport(&self, err: reqwest::Error) -> ChannelError {
        if err.is_timeout() {
            ChannelError::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            ChannelError::Network(err.to_string())
        }
    }
}

fn parse_updates_response(status: u16, body: &str) -> Result<Vec<Update>, ChannelError> {
    let response: UpdatesResponse =
        serde_json::from_str(body).map_err(|e| ChannelError::Malformed(e.to_string()))?;

    if !response.ok {
        return Err(api_failure(
            status,
            response.error_code,
            response.description,
            response.parameters.and_then(|p| p.retry_after),
        ));
    }
    Ok(response.result)
}

fn parse_ack_response(status: u16, body: &str) -> Result<(), ChannelError> {
    let response: AckResponse =
        serde_json::from_str(body).map_err(|e| ChannelError::Malformed(e.to_string()))?;

    if !response.ok {
        return Err(api_failure(
            status,
            response.error_code,
            response.description,
            response.parameters.and_then(|p| p.retry_after),
        ));
    }
    Ok(())
}

#[async_trait]
impl BotApi for TelegramBot {
    async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>, ChannelError> {
        let response = self
            .client
            .get(self.method_url("getUpdates"))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", timeout_secs.to_string()),
                ("allowed_updates", ALLOWED_UPDATES.to_string()),
            ])
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.map_transport(e))?;
        let updates = parse_updates_response(status, &body)?;
        if !updates.is_empty() {
            debug!("Received {} updates from offset {}", updates.len(), offset);
        }
        Ok(updates)
    }

    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<(), ChannelError> {
        let request = SendMessageRequest {
            chat_id,
            text,
            reply_to_message_id: reply_to,
        };

        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.map_transport(e))?;
        parse_ack_response(status, &body)
    }
}
