// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Ceilings and quality schedule for preview transformation

use crate::config::env_var;

/// Default byte ceiling for previews (9 MiB)
pub const DEFAULT_MAX_BYTES: usize = 9 * 1024 * 1024;
/// Default longest-edge ceiling for previews
pub const DEFAULT_MAX_DIMENSION: u32 = 4950;
/// Default cap on a single decoder allocation (2 GiB)
///
/// Covers a 20000x15000 RGBA source, which decodes to 1.2 GB.
pub const DEFAULT_MAX_DECODE_BYTES: u64 = 2 * 1024 * 1024 * 1024;

/// Preview transformation settings
#[derive(Debug, Clone)]
pub struct TransformConfig {
    /// Encoded previews should be at or under this many bytes
    pub max_bytes: usize,
    /// Neither edge of a preview may exceed this many pixels
    pub max_dimension: u32,
    /// JPEG quality of the first encoding attempt
    pub start_quality: u8,
    /// Quality decrease between attempts
    pub quality_step: u8,
    /// Lowest quality tried; reaching it ends the loop regardless of size
    pub quality_floor: u8,
    /// Largest single allocation the decoder may make for a source image
    pub max_decode_bytes: u64,
}

impl TransformConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_bytes: env_var("TRANSFORM_MAX_BYTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_bytes),
            max_dimension: env_var("TRANSFORM_MAX_DIMENSION")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_dimension),
            start_quality: defaults.start_quality,
            quality_step: env_var("TRANSFORM_QUALITY_STEP")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.quality_step),
            quality_floor: env_var("TRANSFORM_QUALITY_FLOOR")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.quality_floor),
            max_decode_bytes: env_var("TRANSFORM_MAX_DECODE_BYTES")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_decode_bytes),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_bytes == 0 || self.max_dimension == 0 || self.max_decode_bytes == 0 {
            return Err("Transform ceilings must be greater than 0".to_string());
        }
        if self.quality_step == 0 {
            return Err("Quality step must be greater than 0".to_string());
        }
        if self.quality_floor == 0 || self.quality_floor > self.start_quality {
            return Err(format!(
                "Quality floor must be within 1..={}",
                self.start_quality
            ));
        }
        if self.start_quality > 100 {
            return Err("Start quality cannot exceed 100".to_string());
        }
        Ok(())
    }

    /// Whether an image of this size and shape must be transformed before sending
    pub fn needs_transform(&self, size_bytes: usize, width: u32, height: u32) -> bool {
        size_bytes > self.max_bytes || width > self.max_dimension || height > self.max_dimension
    }
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            max_dimension: DEFAULT_MAX_DIMENSION,
            start_quality: 100,
            quality_step: 1,
            quality_floor: 50,
            max_decode_bytes: DEFAULT_MAX_DECODE_BYTES,
        }
    }
}
