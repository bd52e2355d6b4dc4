// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Publish pipeline
//!
//! Turns a candidate into a preview and an original on the output channel
//! and a committed history record. Shared by the source pollers and the
//! forward session so both obey the same dedup and commit contract.

pub mod config;
pub mod pipeline;
pub mod types;

pub use config::PublishConfig;
pub use pipeline::PublishPipeline;
pub use types::{CandidateItem, PublishError, PublishOutcome, StagedPublish};
