// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Output channel
//!
//! Where published assets go. The pipeline only needs to send one asset and
//! get back a reference it can store or send again.

pub mod config;
pub mod mock;
pub mod telegram;
pub mod types;

use async_trait::async_trait;

pub use config::ChannelConfig;
pub use mock::{RecordingChannel, SentAsset};
pub use telegram::TelegramChannel;
pub use types::{AssetKind, AssetPayload, AssetRef, ChannelError, OutgoingAsset};

/// Destination for published assets
#[async_trait]
pub trait OutputChannel: Send + Sync {
    /// Send one asset and return the channel's reference for it
    async fn send_asset(&self, asset: OutgoingAsset) -> Result<AssetRef, ChannelError>;

    /// Channel name for logging
    fn name(&self) -> &'static str;
}
