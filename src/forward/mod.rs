// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Operator-driven manual forwarding
//!
//! An operator starts a session, sends a preview (and optionally a distinct
//! original) per page, and commits pages one at a time. Pages are keyed
//! `<baseId>_p<n>` and go through the same dedup and commit path as polled
//! items.

pub mod commands;
pub mod config;
pub mod controller;
pub mod session;

pub use commands::{parse_start_text, CommandReply, OperatorCommand, OperatorConsole};
pub use config::{ForwardConfig, OperatorId};
pub use controller::{CommittedPage, ForwardController, SessionEnd};
pub use session::{ForwardError, ForwardSession, ForwardState, StagedAsset};
