// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Manual multi-page forward session
//!
//! ```text
//! Idle -> AwaitingPreview -> AwaitingOriginal -> Ready -> AwaitingPreview (next page)
//!                        \___________________________/          \-> Idle (end)
//! ```

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use super::config::{ForwardConfig, OperatorId};
use crate::channel::AssetRef;
use crate::publish::{PublishError, StagedPublish};

/// Where the session is in its page cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum ForwardState {
    #[default]
    Idle,
    AwaitingPreview,
    AwaitingOriginal,
    Ready,
}

impl fmt::Display for ForwardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ForwardState::Idle => "idle",
            ForwardState::AwaitingPreview => "awaiting preview",
            ForwardState::AwaitingOriginal => "awaiting original",
            ForwardState::Ready => "ready",
        };
        f.write_str(name)
    }
}

/// An asset the operator sent to the bot, held until the page is committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedAsset {
    pub asset: AssetRef,
    pub width: u32,
    pub height: u32,
}

impl StagedAsset {
    pub fn new(asset: AssetRef, width: u32, height: u32) -> Self {
        Self {
            asset,
            width,
            height,
        }
    }
}

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("Operator {operator} is not allowed to forward")]
    Unauthorized { operator: OperatorId },

    #[error("Cannot {operation} while {state}")]
    InvalidState {
        operation: &'static str,
        state: ForwardState,
    },

    #[error("No preview staged for the current page")]
    NothingStaged,

    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// State of the single process-wide forward session
#[derive(Debug, Clone, Default)]
pub struct ForwardSession {
    state: ForwardState,
    base_id: String,
    page_index: u32,
    title: String,
    tags: String,
    staged_preview: Option<StagedAsset>,
    staged_original: Option<StagedAsset>,
}

impl ForwardSession {
    pub fn state(&self) -> ForwardState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != ForwardState::Idle
    }

    pub fn base_id(&self) -> &str {
        &self.base_id
    }

    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn tags(&self) -> &str {
        &self.tags
    }

    pub fn staged_preview(&self) -> Option<&StagedAsset> {
        self.staged_preview.as_ref()
    }

    pub fn staged_original(&self) -> Option<&StagedAsset> {
        self.staged_original.as_ref()
    }

    /// Begin a new session, replacing whatever was active
    pub fn start(&mut self, base_id: String, title: String, tags: String) {
        *self = Self {
            state: ForwardState::AwaitingPreview,
            base_id,
            page_index: 0,
            title,
            tags,
            staged_preview: None,
            staged_original: None,
        };
    }

    pub fn stage_preview(
        &mut self,
        asset: StagedAsset,
        expects_original: bool,
    ) -> Result<ForwardState, ForwardError> {
        self.require(ForwardState::AwaitingPreview, "stage a preview")?;
        self.staged_preview = Some(asset);
        self.state = if expects_original {
            ForwardState::AwaitingOriginal
        } else {
            ForwardState::Ready
        };
        Ok(self.state)
    }

    pub fn stage_original(&mut self, asset: StagedAsset) -> Result<ForwardState, ForwardError> {
        self.require(ForwardState::AwaitingOriginal, "stage an original")?;
        self.staged_original = Some(asset);
        self.state = ForwardState::Ready;
        Ok(self.state)
    }

    /// Key of the page currently being staged
    pub fn page_key(&self) -> String {
        format!("{}_p{}", self.base_id, self.page_index)
    }

    /// Caption for the current page: `<title> [P<n>]`, tags on a second line
    pub fn page_caption(&self, default_title: &str) -> String {
        let title = if self.title.is_empty() {
            default_title
        } else {
            self.title.as_str()
        };
        let caption = format!("{} [P{}]", title, self.page_index);
        if self.tags.is_empty() {
            caption
        } else {
            format!("{}\n{}", caption, self.tags)
        }
    }

    /// Commit request for the current page, if a preview is staged
    pub fn staged_publish(&self, config: &ForwardConfig) -> Option<StagedPublish> {
        let preview = self.staged_preview.as_ref()?;
        let tags = if self.tags.is_empty() {
            config.source_tag.clone()
        } else {
            self.tags.clone()
        };

        Some(StagedPublish {
            key: self.page_key(),
            source_tag: config.source_tag.clone(),
            caption: self.page_caption(&config.default_title),
            tags,
            preview: preview.asset.clone(),
            original: self.staged_original.as_ref().map(|o| o.asset.clone()),
            width: preview.width,
            height: preview.height,
        })
    }

    /// Move on to the next page after a commit
    pub fn advance(&mut self) {
        self.staged_preview = None;
        self.staged_original = None;
        self.page_index += 1;
        self.state = ForwardState::AwaitingPreview;
    }

    /// Drop the session entirely
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn require(&self, expected: ForwardState, operation: &'static str) -> Result<(), ForwardError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ForwardError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }
}
