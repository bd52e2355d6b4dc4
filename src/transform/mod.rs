// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Asset transformation
//!
//! Turns an arbitrary source image into a preview the output channel will
//! accept: one proportional downscale to the dimension ceiling, then a
//! bounded JPEG quality loop against the byte ceiling.

pub mod compress;
pub mod config;
pub mod image_utils;

pub use compress::{fit_within, transform, TransformError, TransformOutput};
pub use config::TransformConfig;
pub use image_utils::{decode_image_bytes, detect_format, extension_for, ImageError, ImageInfo};
