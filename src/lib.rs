// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod channel;
pub mod cli;
pub mod config;
pub mod forward;
pub mod history;
pub mod intake;
pub mod publish;
pub mod sources;
pub mod store;
pub mod transform;
pub mod version;

// Re-export main types
pub use channel::{AssetKind, AssetRef, ChannelError, OutgoingAsset, OutputChannel};
pub use config::{ConfigError, RelayConfig};
pub use forward::{ForwardController, ForwardError, ForwardSession, ForwardState, OperatorId};
pub use history::{FlushOutcome, HistoryCache};
pub use publish::{CandidateItem, PublishError, PublishOutcome, PublishPipeline};
pub use sources::{CandidateSource, CandidateStub, SourceError};
pub use store::{HistoryRecord, PersistentStore, StoreError};
pub use transform::{transform, TransformConfig, TransformError, TransformOutput};
