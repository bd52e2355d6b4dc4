// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Owner of the forward session
//!
//! One session per process behind one mutex. `start` always wins: an
//! active session is replaced, not queued.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use super::config::{ForwardConfig, OperatorId};
use super::session::{ForwardError, ForwardSession, ForwardState, StagedAsset};
use crate::publish::{PublishError, PublishOutcome, PublishPipeline};
use crate::store::HistoryRecord;

/// A page that was committed (or found already committed)
#[derive(Debug, Clone)]
pub struct CommittedPage {
    pub key: String,
    pub page: u32,
    /// `None` when the key was already in the history
    pub record: Option<HistoryRecord>,
}

/// What `end` did before going idle
#[derive(Debug, Default)]
pub struct SessionEnd {
    pub was_active: bool,
    pub final_page: Option<CommittedPage>,
    /// Set when the final staged page could not be committed
    pub final_error: Option<PublishError>,
}

pub struct ForwardController {
    session: Mutex<ForwardSession>,
    pipeline: Arc<PublishPipeline>,
    config: ForwardConfig,
}

impl ForwardController {
    pub fn new(pipeline: Arc<PublishPipeline>, config: ForwardConfig) -> Self {
        Self {
            session: Mutex::new(ForwardSession::default()),
            pipeline,
            config,
        }
    }

    pub fn config(&self) -> &ForwardConfig {
        &self.config
    }

    pub fn authorize(&self, operator: OperatorId) -> Result<(), ForwardError> {
        if self.config.is_operator(operator) {
            Ok(())
        } else {
            warn!("Rejected forward command from {}", operator);
            Err(ForwardError::Unauthorized { operator })
        }
    }

    /// Start a session, replacing any active one
    ///
    /// The base id is derived from `origin_id` (the id of the message that
    /// started the session) when given, otherwise it is random.
    pub async fn start(
        &self,
        operator: OperatorId,
        title: &str,
        tags: &str,
        origin_id: Option<i64>,
    ) -> Result<ForwardSession, ForwardError> {
        self.authorize(operator)?;

        let base_id = match origin_id {
            Some(id) => format!("manual_{}", id),
            None => format!("manual_{}", Uuid::new_v4().simple()),
        };

        let mut session = self.session.lock().await;
        if session.is_active() {
            warn!(
                "Replacing active forward session {} at page {}",
                session.base_id(),
                session.page_index()
            );
        }
        session.start(base_id, title.trim().to_string(), tags.trim().to_string());
        info!("Forward session {} started by {}", session.base_id(), operator);
        Ok(session.clone())
    }

    pub async fn stage_preview(
        &self,
        operator: OperatorId,
        asset: StagedAsset,
        expects_original: bool,
    ) -> Result<ForwardState, ForwardError> {
        self.authorize(operator)?;
        self.session.lock().await.stage_preview(asset, expects_original)
    }

    pub async fn stage_original(
        &self,
        operator: OperatorId,
        asset: StagedAsset,
    ) -> Result<ForwardState, ForwardError> {
        self.authorize(operator)?;
        self.session.lock().await.stage_original(asset)
    }

    /// Commit the staged page and move on to the next one
    ///
    /// On a commit failure nothing changes and the caller may retry.
    pub async fn continue_session(&self, operator: OperatorId) -> Result<CommittedPage, ForwardError> {
        self.authorize(operator)?;

        let mut session = self.session.lock().await;
        match session.state() {
            ForwardState::Ready => {}
            ForwardState::AwaitingPreview => return Err(ForwardError::NothingStaged),
            state => {
                return Err(ForwardError::InvalidState {
                    operation: "continue",
                    state,
                })
            }
        }

        let page = self.commit_current(&session).await?;
        session.advance();
        info!(
            "Forward page {} done, waiting for page {}",
            page.key,
            session.page_index()
        );
        Ok(page)
    }

    /// Commit a staged page if there is one, then go idle regardless
    pub async fn end(&self, operator: OperatorId) -> Result<SessionEnd, ForwardError> {
        self.authorize(operator)?;

        let mut session = self.session.lock().await;
        let mut report = SessionEnd {
            was_active: session.is_active(),
            ..Default::default()
        };

        if session.staged_preview().is_some() {
            match self.commit_current(&session).await {
                Ok(page) => report.final_page = Some(page),
                Err(ForwardError::Publish(e)) => {
                    warn!("Final page of {} not committed: {}", session.base_id(), e);
                    report.final_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        if report.was_active {
            info!("Forward session {} ended", session.base_id());
        }
        session.reset();
        Ok(report)
    }

    /// Read-only copy of the current session
    pub async fn snapshot(&self) -> ForwardSession {
        self.session.lock().await.clone()
    }

    async fn commit_current(&self, session: &ForwardSession) -> Result<CommittedPage, ForwardError> {
        let staged = session
            .staged_publish(&self.config)
            .ok_or(ForwardError::NothingStaged)?;
        let key = staged.key.clone();

        let record = match self.pipeline.commit_staged(staged).await? {
            PublishOutcome::Published(record) => Some(record),
            PublishOutcome::AlreadyPublished => {
                warn!("{} already published, moving on", key);
                None
            }
            PublishOutcome::Skipped(e) => return Err(ForwardError::Publish(e)),
        };

        Ok(CommittedPage {
            key,
            page: session.page_index(),
            record,
        })
    }
}
