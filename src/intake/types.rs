// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Bot API update payloads and what a message asks for

use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

use crate::channel::AssetRef;
use crate::forward::{OperatorId, StagedAsset};

/// One entry of a getUpdates answer; only messages are used
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub photo: Vec<PhotoSize>,
    #[serde(default)]
    pub document: Option<Document>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Document {
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default, alias = "thumb")]
    pub thumbnail: Option<PhotoSize>,
}

/// What an incoming message asks the relay to do
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Text starting with `/`
    Command(String),
    /// Largest size of a photo
    Photo(StagedAsset),
    /// A file; dimensions come from its thumbnail when there is one
    Document(StagedAsset),
    /// A yande.re post link
    Link(u64),
    Other,
}

impl Message {
    /// The sending user; channel posts have none
    pub fn sender(&self) -> Option<OperatorId> {
        self.from.as_ref().map(|u| OperatorId(u.id))
    }

    pub fn classify(&self) -> Inbound {
        if let Some(largest) = self
            .photo
            .iter()
            .max_by_key(|p| u64::from(p.width) * u64::from(p.height))
        {
            return Inbound::Photo(StagedAsset::new(
                AssetRef::new(largest.file_id.clone()),
                largest.width,
                largest.height,
            ));
        }

        if let Some(document) = &self.document {
            let (width, height) = document
                .thumbnail
                .as_ref()
                .map(|t| (t.width, t.height))
                .unwrap_or((0, 0));
            return Inbound::Document(StagedAsset::new(
                AssetRef::new(document.file_id.clone()),
                width,
                height,
            ));
        }

        let text = match self.text.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => text,
            _ => return Inbound::Other,
        };

        if text.starts_with('/') {
            return Inbound::Command(text.to_string());
        }
        parse_post_link(text).map_or(Inbound::Other, Inbound::Link)
    }
}

fn post_link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"yande\.re/post/show/(\d+)").unwrap())
}

/// Post id of the first yande.re post link in `text`
pub fn parse_post_link(text: &str) -> Option<u64> {
    post_link_pattern()
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
