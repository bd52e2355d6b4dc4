// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Inbound bot updates
//!
//! Long-polls the Bot API for messages sent to the bot and routes them:
//! commands to the operator console, photos and files to the forward
//! session, post links to the publish pipeline. Replies go back to the
//! chat the message came from.

pub mod config;
pub mod dispatcher;
pub mod runner;
pub mod telegram;
pub mod types;

use async_trait::async_trait;

use crate::channel::ChannelError;

pub use config::IntakeConfig;
pub use dispatcher::{render_reply, UpdateDispatcher};
pub use runner::run_intake;
pub use telegram::TelegramBot;
pub use types::{parse_post_link, Chat, Document, Inbound, Message, PhotoSize, Update, User};

/// The bot side of the Bot API: receiving updates and answering them
#[async_trait]
pub trait BotApi: Send + Sync {
    /// Updates with an id of at least `offset`, waiting up to `timeout_secs`
    /// for one to arrive
    async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>, ChannelError>;

    /// Send a plain text message, optionally as a reply
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_to: Option<i64>,
    ) -> Result<(), ChannelError>;
}
