// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! getUpdates loop
//!
//! Updates are handled one at a time, in order. The offset only moves past
//! an update once it has been handled, so updates left over at shutdown are
//! delivered again on the next start.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::config::IntakeConfig;
use super::dispatcher::UpdateDispatcher;
use super::BotApi;
use crate::channel::ChannelError;
use crate::sources::wait_or_cancel;

/// Poll `bot` for updates until `cancel` fires; returns the next offset
pub async fn run_intake(
    bot: Arc<dyn BotApi>,
    dispatcher: Arc<UpdateDispatcher>,
    config: IntakeConfig,
    cancel: CancellationToken,
) -> i64 {
    info!("Update intake started");
    let mut offset = 0;

    'poll: while !cancel.is_cancelled() {
        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = bot.get_updates(offset, config.poll_timeout_secs) => result,
        };

        let updates = match result {
            Ok(updates) => updates,
            Err(e) => {
                let wait = match &e {
                    ChannelError::RateLimited { retry_after_secs } => {
                        config.retry_delay.max(Duration::from_secs(*retry_after_secs))
                    }
                    _ => config.retry_delay,
                };
                warn!("getUpdates failed: {}, retrying in {:?}", e, wait);
                if !wait_or_cancel(&cancel, wait).await {
                    break;
                }
                continue;
            }
        };

        for update in updates {
            if cancel.is_cancelled() {
                break 'poll;
            }
            offset = offset.max(update.update_id + 1);

            let Some(message) = update.message else {
                continue;
            };
            let Some(reply) = dispatcher.dispatch(&message).await else {
                continue;
            };

            debug!("Replying to message {} in {}", message.message_id, message.chat.id);
            if let Err(e) = bot
                .send_message(message.chat.id, &reply, Some(message.message_id))
                .await
            {
                warn!("Reply to message {} failed: {}", message.message_id, e);
            }
        }
    }

    info!("Update intake stopped at offset {}", offset);
    offset
}
