// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Operator command parsing and dispatch
//!
//! Turning replies into chat messages is left to the caller.

use std::sync::Arc;
use tracing::{error, info};

use super::config::OperatorId;
use super::controller::{CommittedPage, ForwardController};
use super::session::ForwardError;
use crate::history::HistoryCache;

/// A recognised operator command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    ForwardStart { title: String, tags: String },
    ForwardContinue,
    ForwardEnd,
    Delete { key: String },
}

impl OperatorCommand {
    /// Parse a chat message; `None` when it is not an operator command
    ///
    /// A `@botname` suffix on the command word is ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if !text.starts_with('/') {
            return None;
        }

        let (word, rest) = match text.find(char::is_whitespace) {
            Some(idx) => (&text[..idx], text[idx..].trim()),
            None => (text, ""),
        };
        let command = word.split('@').next().unwrap_or(word);

        match command {
            "/forward_start" => {
                let (title, tags) = parse_start_text(rest);
                Some(OperatorCommand::ForwardStart { title, tags })
            }
            "/forward_continue" => Some(OperatorCommand::ForwardContinue),
            "/forward_end" => Some(OperatorCommand::ForwardEnd),
            "/delete" => Some(OperatorCommand::Delete {
                key: rest.split_whitespace().next().unwrap_or("").to_string(),
            }),
            _ => None,
        }
    }
}

/// Split start text at the first `#` into a title and a tag string
///
/// `"Sunset set #sky #clouds"` gives `("Sunset set", "#sky #clouds")`.
pub fn parse_start_text(raw: &str) -> (String, String) {
    let raw = raw.trim();
    match raw.find('#') {
        Some(idx) => (raw[..idx].trim().to_string(), raw[idx..].trim().to_string()),
        None => (raw.to_string(), String::new()),
    }
}

/// Typed result of handling one command
#[derive(Debug)]
pub enum CommandReply {
    Started {
        base_id: String,
        title: String,
        tags: String,
    },
    PageCommitted {
        page: CommittedPage,
        next_page: u32,
    },
    Ended {
        final_page: Option<CommittedPage>,
        final_error: Option<String>,
    },
    NoActiveSession,
    Deleted {
        key: String,
    },
    Rejected(ForwardError),
    Failed(String),
    Usage(&'static str),
}

/// Dispatches operator commands to the forward controller and the history
pub struct OperatorConsole {
    controller: Arc<ForwardController>,
    cache: Arc<HistoryCache>,
}

impl OperatorConsole {
    pub fn new(controller: Arc<ForwardController>, cache: Arc<HistoryCache>) -> Self {
        Self { controller, cache }
    }

    /// Handle one message from `operator`
    ///
    /// Returns `None` for text that is not a command. `origin_id` is the id
    /// of the message carrying the command.
    pub async fn handle(
        &self,
        operator: OperatorId,
        origin_id: Option<i64>,
        text: &str,
    ) -> Option<CommandReply> {
        let command = OperatorCommand::parse(text)?;
        if let Err(e) = self.controller.authorize(operator) {
            return Some(CommandReply::Rejected(e));
        }

        let reply = match command {
            OperatorCommand::ForwardStart { title, tags } => {
                match self.controller.start(operator, &title, &tags, origin_id).await {
                    Ok(session) => CommandReply::Started {
                        base_id: session.base_id().to_string(),
                        title,
                        tags,
                    },
                    Err(e) => CommandReply::Rejected(e),
                }
            }
            OperatorCommand::ForwardContinue => {
                if !self.controller.snapshot().await.is_active() {
                    return Some(CommandReply::NoActiveSession);
                }
                match self.controller.continue_session(operator).await {
                    Ok(page) => CommandReply::PageCommitted {
                        next_page: page.page + 1,
                        page,
                    },
                    Err(ForwardError::Publish(e)) => CommandReply::Failed(e.to_string()),
                    Err(e) => CommandReply::Rejected(e),
                }
            }
            OperatorCommand::ForwardEnd => match self.controller.end(operator).await {
                Ok(end) if !end.was_active => CommandReply::NoActiveSession,
                Ok(end) => CommandReply::Ended {
                    final_page: end.final_page,
                    final_error: end.final_error.map(|e| e.to_string()),
                },
                Err(e) => CommandReply::Rejected(e),
            },
            OperatorCommand::Delete { key } if key.is_empty() => {
                CommandReply::Usage("/delete <key>")
            }
            OperatorCommand::Delete { key } => match self.cache.delete(&key).await {
                Ok(()) => {
                    info!("{} deleted {}", operator, key);
                    CommandReply::Deleted { key }
                }
                Err(e) => {
                    error!("Delete of {} failed: {}", key, e);
                    CommandReply::Failed(e.to_string())
                }
            },
        };
        Some(reply)
    }
}
