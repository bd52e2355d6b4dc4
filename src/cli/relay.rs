// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Wiring of the relay components and the binary's commands

use anyhow::{Context, Result};
use clap::Args;
use futures::future::join_all;
use std::sync::Arc;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::channel::{OutputChannel, TelegramChannel};
use crate::config::RelayConfig;
use crate::forward::{ForwardController, OperatorConsole};
use crate::history::{FlushOutcome, HistoryCache};
use crate::intake::{run_intake, BotApi, TelegramBot, UpdateDispatcher};
use crate::publish::PublishPipeline;
use crate::sources::{run_source, CandidateSource, DanbooruSource, PostLookup, YandeSource};
use crate::store::{D1Store, PersistentStore};

/// Arguments for the delete command
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Key of the record to remove, e.g. yande_1234
    pub key: String,
}

/// Arguments for the sync-history command
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Write the loaded key list back to the worker
    #[arg(long)]
    pub push: bool,
}

/// Every long-lived component of one relay process
pub struct RelayStack {
    pub config: RelayConfig,
    pub cache: Arc<HistoryCache>,
    pub pipeline: Arc<PublishPipeline>,
    pub forward: Arc<ForwardController>,
    pub console: Arc<OperatorConsole>,
    pub intake: Arc<UpdateDispatcher>,
    yande: Arc<YandeSource>,
}

impl RelayStack {
    /// Build the history layer only; enough for maintenance commands
    pub fn history(config: &RelayConfig) -> Result<Arc<HistoryCache>> {
        config
            .store
            .validate()
            .map_err(|reason| anyhow::anyhow!("Invalid store configuration: {}", reason))?;
        let store: Arc<dyn PersistentStore> =
            Arc::new(D1Store::new(&config.store).context("Failed to create D1 store")?);
        Ok(Arc::new(HistoryCache::new(store, config.history.clone())))
    }

    pub fn build(config: RelayConfig) -> Result<Self> {
        config.validate()?;

        let cache = Self::history(&config)?;
        let channel: Arc<dyn OutputChannel> = Arc::new(
            TelegramChannel::new(&config.channel).context("Failed to create Telegram channel")?,
        );
        let pipeline = Arc::new(PublishPipeline::new(
            cache.clone(),
            channel,
            config.transform.clone(),
            config.publish.clone(),
        ));
        let forward = Arc::new(ForwardController::new(
            pipeline.clone(),
            config.forward.clone(),
        ));
        let console = Arc::new(OperatorConsole::new(forward.clone(), cache.clone()));

        // Links are resolved through yande even when its poller is off
        let yande = Arc::new(
            YandeSource::new(config.sources.yande.clone()).context("Failed to create yande source")?,
        );
        let links: Arc<dyn PostLookup> = yande.clone();
        let intake = Arc::new(UpdateDispatcher::new(
            console.clone(),
            forward.clone(),
            pipeline.clone(),
            Some(links),
            config.intake.clone(),
        ));

        Ok(Self {
            config,
            cache,
            pipeline,
            forward,
            console,
            intake,
            yande,
        })
    }

    /// Enabled sources, in start order
    pub fn sources(&self) -> Result<Vec<Arc<dyn CandidateSource>>> {
        let mut sources: Vec<Arc<dyn CandidateSource>> = Vec::new();

        if self.config.sources.yande.enabled() {
            sources.push(self.yande.clone());
        } else {
            info!("Yande disabled (limit 0)");
        }

        if self.config.sources.danbooru.enabled() {
            sources.push(Arc::new(DanbooruSource::new(
                self.config.sources.danbooru.clone(),
            )?));
        } else {
            info!("Danbooru disabled (no tags or limit)");
        }

        Ok(sources)
    }
}

/// Run the pollers and the update intake until Ctrl-C
pub async fn run(config: RelayConfig) -> Result<()> {
    info!("Starting {}", crate::version::get_version_string());
    let stack = RelayStack::build(config)?;

    // Pollers must not start before the history is loaded
    let loaded = stack
        .cache
        .load_initial()
        .await
        .context("History sync failed in strict startup mode")?;
    info!("History ready with {} keys", loaded);

    let cancel = CancellationToken::new();
    let timing = stack.config.sources.timing();
    let mut handles: Vec<JoinHandle<()>> = Vec::new();

    for source in stack.sources()? {
        handles.push(tokio::spawn(run_source(
            source,
            stack.cache.clone(),
            stack.pipeline.clone(),
            timing,
            cancel.child_token(),
        )));
    }

    if handles.is_empty() {
        warn!("No sources enabled");
    }

    if stack.config.intake.enabled {
        let bot: Arc<dyn BotApi> = Arc::new(
            TelegramBot::new(&stack.config.channel, &stack.config.intake)
                .context("Failed to create Telegram update intake")?,
        );
        let dispatcher = stack.intake.clone();
        let config = stack.config.intake.clone();
        let token = cancel.child_token();
        handles.push(tokio::spawn(async move {
            run_intake(bot, dispatcher, config, token).await;
        }));
    } else {
        info!("Update intake disabled, operator commands and links are not received");
    }

    signal::ctrl_c().await?;
    info!("Shutting down...");
    cancel.cancel();

    for result in join_all(handles).await {
        if let Err(e) = result {
            error!("Relay task failed: {}", e);
        }
    }

    final_flush(&stack.cache).await;
    Ok(())
}

/// Push the key list once more on shutdown, ignoring the debounce window
///
/// Returns the number of keys written, if any.
pub async fn final_flush(cache: &HistoryCache) -> Option<usize> {
    match cache.flush_now().await {
        Ok(FlushOutcome::Written { keys }) => {
            info!("Final history flush wrote {} keys", keys);
            Some(keys)
        }
        Ok(outcome) => {
            warn!("Final history flush skipped: {:?}", outcome);
            None
        }
        Err(e) => {
            error!("Final history flush failed: {}", e);
            None
        }
    }
}

/// Remove a published record and push the corrected key list
pub async fn delete(config: RelayConfig, args: DeleteArgs) -> Result<()> {
    let cache = RelayStack::history(&config)?;
    cache.load_initial().await?;
    cache
        .delete(&args.key)
        .await
        .with_context(|| format!("Failed to delete {}", args.key))?;

    match cache.flush_now().await? {
        FlushOutcome::Written { keys } => info!("Key list rewritten with {} keys", keys),
        outcome => warn!("Key list not rewritten: {:?}", outcome),
    }
    println!("Deleted {}", args.key);
    Ok(())
}

/// Load the remote key list and report it, optionally writing it back
pub async fn sync_history(config: RelayConfig, args: SyncArgs) -> Result<()> {
    let mut config = config;
    config.history.strict_startup = true;
    let cache = RelayStack::history(&config)?;

    let loaded = cache.load_initial().await?;
    println!("Loaded {} keys from history", loaded);

    if args.push {
        if let FlushOutcome::Written { keys } = cache.flush_now().await? {
            println!("Pushed {} keys", keys);
        }
    }
    Ok(())
}
