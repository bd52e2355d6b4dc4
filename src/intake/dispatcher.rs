// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Routing of one inbound message to the relay components

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::config::IntakeConfig;
use super::types::{Inbound, Message};
use crate::forward::{
    CommandReply, ForwardController, ForwardState, OperatorConsole, OperatorId, StagedAsset,
};
use crate::publish::{PublishOutcome, PublishPipeline};
use crate::sources::{CandidateSource, PostLookup};

/// Turn a console reply into chat text
pub fn render_reply(reply: &CommandReply) -> String {
    match reply {
        CommandReply::Started { base_id, title, .. } if title.is_empty() => {
            format!("Forward session {} started, send page 0", base_id)
        }
        CommandReply::Started { base_id, title, .. } => {
            format!("Forward session {} ({}) started, send page 0", base_id, title)
        }
        CommandReply::PageCommitted { page, next_page } => match page.record {
            Some(_) => format!("Published {}, send page {}", page.key, next_page),
            None => format!("{} was already published, send page {}", page.key, next_page),
        },
        CommandReply::Ended {
            final_page,
            final_error,
        } => match (final_page, final_error) {
            (Some(page), _) => format!("Forward session ended after publishing {}", page.key),
            (None, Some(e)) => format!("Forward session ended, last page not published: {}", e),
            (None, None) => "Forward session ended".to_string(),
        },
        CommandReply::NoActiveSession => "No forward session is active".to_string(),
        CommandReply::Deleted { key } => format!("Deleted {}", key),
        CommandReply::Rejected(e) => e.to_string(),
        CommandReply::Failed(e) => format!("Failed: {}", e),
        CommandReply::Usage(usage) => format!("Usage: {}", usage),
    }
}

/// Routes messages sent to the bot
///
/// Only operators can stage assets or publish links; anything else from
/// other users is dropped without a reply.
pub struct UpdateDispatcher {
    console: Arc<OperatorConsole>,
    forward: Arc<ForwardController>,
    pipeline: Arc<PublishPipeline>,
    links: Option<Arc<dyn PostLookup>>,
    config: IntakeConfig,
}

impl UpdateDispatcher {
    pub fn new(
        console: Arc<OperatorConsole>,
        forward: Arc<ForwardController>,
        pipeline: Arc<PublishPipeline>,
        links: Option<Arc<dyn PostLookup>>,
        config: IntakeConfig,
    ) -> Self {
        Self {
            console,
            forward,
            pipeline,
            links,
            config,
        }
    }

    /// Handle one message, returning the reply text if there is one
    pub async fn dispatch(&self, message: &Message) -> Option<String> {
        let sender = message.sender()?;
        match message.classify() {
            Inbound::Command(text) => self
                .console
                .handle(sender, Some(message.message_id), &text)
                .await
                .map(|reply| render_reply(&reply)),
            Inbound::Photo(asset) => self.stage(sender, asset, false).await,
            Inbound::Document(asset) => self.stage(sender, asset, true).await,
            Inbound::Link(post_id) => self.publish_link(sender, post_id).await,
            Inbound::Other => None,
        }
    }

    /// Stage a photo as the current page's preview or a file as its original
    ///
    /// Previews are re-sent as photos, so a file is never staged as one.
    async fn stage(&self, sender: OperatorId, asset: StagedAsset, is_file: bool) -> Option<String> {
        if !self.forward.config().is_operator(sender) {
            return None;
        }

        let session = self.forward.snapshot().await;
        let result = match (session.state(), is_file) {
            (ForwardState::Idle, _) => {
                debug!("Ignoring asset from {} outside a forward session", sender);
                return None;
            }
            (ForwardState::AwaitingPreview, true) => {
                return Some(format!(
                    "Send the preview for page {} as a photo first",
                    session.page_index()
                ));
            }
            (_, true) => self.forward.stage_original(sender, asset).await,
            (_, false) => {
                self.forward
                    .stage_preview(sender, asset, self.config.expect_original)
                    .await
            }
        };

        let page = session.page_index();
        Some(match result {
            Ok(ForwardState::AwaitingOriginal) => {
                format!("Preview for page {} staged, send the original as a file", page)
            }
            Ok(_) => format!("Page {} staged, /forward_continue to publish it", page),
            Err(e) => e.to_string(),
        })
    }

    /// Publish the post behind a link unless it is already in the history
    async fn publish_link(&self, sender: OperatorId, post_id: u64) -> Option<String> {
        let links = self.links.as_ref()?;
        if !self.forward.config().is_operator(sender) {
            return None;
        }
        if self.forward.snapshot().await.is_active() {
            debug!("Ignoring post link while a forward session is active");
            return None;
        }

        let cache = self.pipeline.cache();
        let key = links.key_for(post_id);
        if cache.check_exists(&key).await {
            return Some(format!("{} was already published", key));
        }

        let stub = match links.lookup(post_id).await {
            Ok(Some(stub)) => stub,
            Ok(None) => return Some(format!("{} not found", key)),
            Err(e) => {
                warn!("Lookup of {} failed: {}", key, e);
                return Some(format!("Lookup of {} failed: {}", key, e));
            }
        };

        info!("Downloading {} for {}", stub.key, sender);
        let bytes = match links.download(&stub).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Download of {} failed: {}", key, e);
                return Some(format!("Download of {} failed: {}", key, e));
            }
        };

        let reply = match self.pipeline.publish(stub.into_item(bytes)).await {
            PublishOutcome::Published(record) => format!("Published {}", record.key),
            PublishOutcome::AlreadyPublished => format!("{} was already published", key),
            PublishOutcome::Skipped(e) => format!("{} not published: {}", key, e),
        };

        if let Err(e) = cache.flush().await {
            warn!("History flush after link failed: {}", e);
        }
        Some(reply)
    }
}
