// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Telegram Bot API output channel
//!
//! Previews go out through `sendPhoto`, originals through `sendDocument`.
//! Both are multipart uploads; an existing asset is re-sent by passing its
//! `file_id` in place of the file part.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::config::ChannelConfig;
use super::types::{AssetKind, AssetPayload, AssetRef, ChannelError, OutgoingAsset};
use super::OutputChannel;

/// Telegram rejects captions longer than this many characters
pub const MAX_CAPTION_CHARS: usize = 1024;

/// Output channel backed by the Telegram Bot API
pub struct TelegramChannel {
    client: Client,
    api_base: String,
    bot_token: String,
    channel_id: i64,
    timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    result: Option<SentMessage>,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    #[serde(default)]
    photo: Vec<PhotoSize>,
    #[serde(default)]
    document: Option<FileHandle>,
}

#[derive(Debug, Deserialize)]
struct PhotoSize {
    file_id: String,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

#[derive(Debug, Deserialize)]
struct FileHandle {
    file_id: String,
}

impl TelegramChannel {
    /// Create a new Telegram channel from configuration
    pub fn new(config: &ChannelConfig) -> Result<Self, ChannelError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ChannelError::Network(e.to_string()))?;

        info!("Telegram channel configured for chat {}", config.channel_id);

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            channel_id: config.channel_id,
            timeout_secs: config.timeout_secs,
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

/// Method name and multipart field for an asset kind
fn endpoint_for(kind: AssetKind) -> (&'static str, &'static str) {
    match kind {
        AssetKind::Photo => ("sendPhoto", "photo"),
        AssetKind::Document => ("sendDocument", "document"),
    }
}

/// Cut a caption to the channel limit on a character boundary
pub fn truncate_caption(caption: &str) -> String {
    match caption.char_indices().nth(MAX_CAPTION_CHARS) {
        Some((idx, _)) => caption[..idx].to_string(),
        None => caption.to_string(),
    }
}

/// Map an `ok: false` Bot API answer to a channel error
pub(crate) fn api_failure(
    status: u16,
    error_code: Option<u16>,
    description: Option<String>,
    retry_after: Option<u64>,
) -> ChannelError {
    let code = error_code.unwrap_or(status);
    if code == 429 {
        return ChannelError::RateLimited {
            retry_after_secs: retry_after.unwrap_or(0),
        };
    }
    ChannelError::Rejected {
        status: code,
        description: description.unwrap_or_default(),
    }
}

/// Pull the asset reference out of a Bot API response body
fn parse_send_response(
    status: u16,
    body: &str,
    kind: AssetKind,
) -> Result<AssetRef, ChannelError> {
    let response: ApiResponse =
        serde_json::from_str(body).map_err(|e| ChannelError::Malformed(e.to_string()))?;

    if !response.ok {
        return Err(api_failure(
            status,
            response.error_code,
            response.description,
            response.parameters.and_then(|p| p.retry_after),
        ));
    }

    let message = response
        .result
        .ok_or_else(|| ChannelError::Malformed("missing result".to_string()))?;

    let file_id = match kind {
        AssetKind::Photo => message
            .photo
            .into_iter()
            .max_by_key(|p| u64::from(p.width) * u64::from(p.height))
            .map(|p| p.file_id),
        // Telegram may answer a document upload of an image as a photo
        AssetKind::Document => message.document.map(|d| d.file_id).or_else(|| {
            message
                .photo
                .into_iter()
                .max_by_key(|p| u64::from(p.width) * u64::from(p.height))
                .map(|p| p.file_id)
        }),
    };

    file_id
        .map(AssetRef::new)
        .ok_or_else(|| ChannelError::Malformed("no file_id in sent message".to_string()))
}

#[async_trait]
impl OutputChannel for TelegramChannel {
    async fn send_asset(&self, asset: OutgoingAsset) -> Result<AssetRef, ChannelError> {
        let (method, field) = endpoint_for(asset.kind);
        let size = asset.upload_len();

        let mut form = Form::new()
            .text("chat_id", self.channel_id.to_string())
            .text("caption", truncate_caption(&asset.caption));

        form = match asset.payload {
            AssetPayload::Upload { bytes, filename } => {
                form.part(field, Part::bytes(bytes.to_vec()).file_name(filename))
            }
            AssetPayload::Existing(existing) => form.text(field, existing.into_string()),
        };

        debug!("Telegram {} ({} bytes)", method, size);

        let response = self
            .client
            .post(self.method_url(method))
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.map_transport(e))?;

        let result = parse_send_response(status, &body, asset.kind);
        if let Err(e) = &result {
            warn!("Telegram {} failed: {}", method, e);
        }
        result
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}
