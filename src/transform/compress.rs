// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Downscale and recompress an image until it fits the channel ceilings

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use thiserror::Error;
use tracing::{debug, info};

use super::config::TransformConfig;
use super::image_utils::{decode_image_bytes, ImageError};

/// Errors that end the transformation of one item
#[derive(Debug, Error)]
pub enum TransformError {
    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("Failed to encode JPEG at quality {quality}: {message}")]
    Encode { quality: u8, message: String },

    #[error("Transform task failed: {0}")]
    Task(String),
}

/// A preview produced by [`transform`]
#[derive(Debug, Clone)]
pub struct TransformOutput {
    /// Baseline JPEG bytes
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Quality of the returned encoding
    pub quality: u8,
    /// The quality floor was hit; `bytes` may still exceed `max_bytes`
    pub floor_reached: bool,
}

impl TransformOutput {
    pub fn fits(&self, max_bytes: usize) -> bool {
        self.bytes.len() <= max_bytes
    }
}

/// Shrink `img` so its longest edge is `max_dimension`, keeping the aspect ratio
pub fn fit_within(img: DynamicImage, max_dimension: u32) -> DynamicImage {
    let (width, height) = (img.width(), img.height());
    if width <= max_dimension && height <= max_dimension {
        return img;
    }

    info!(
        "Resizing image from {}x{} to fit {}px",
        width, height, max_dimension
    );
    img.resize(max_dimension, max_dimension, FilterType::Lanczos3)
}

fn encode_jpeg(rgb: &RgbImage, quality: u8) -> Result<Vec<u8>, TransformError> {
    let mut buf = Vec::new();
    {
        let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
        encoder
            .encode_image(rgb)
            .map_err(|e| TransformError::Encode {
                quality,
                message: e.to_string(),
            })?;
    }
    Ok(buf)
}

/// Produce a preview that respects the configured ceilings
///
/// Decodes `bytes`, downscales once if either edge exceeds
/// `max_dimension`, then re-encodes as JPEG starting at `start_quality`
/// and stepping down until the output is at or under `max_bytes` or the
/// quality floor is reached. Quality strictly decreases, so the loop runs
/// at most `(start - floor) / step + 1` times. Output is always a decodable
/// JPEG, even when the floor is hit before the size target.
pub fn transform(bytes: &[u8], config: &TransformConfig) -> Result<TransformOutput, TransformError> {
    let (img, info) = decode_image_bytes(bytes, config.max_decode_bytes)?;
    debug!(
        "Transforming {:?} image {}x{} ({} bytes)",
        info.format, info.width, info.height, info.size_bytes
    );

    let img = fit_within(img, config.max_dimension);
    let rgb = img.to_rgb8();
    let (width, height) = rgb.dimensions();

    let step = config.quality_step.max(1);
    let start = config.start_quality.clamp(1, 100);
    let floor = config.quality_floor.clamp(1, start);
    let mut quality = start;

    loop {
        let encoded = encode_jpeg(&rgb, quality)?;
        let floor_reached = quality <= floor;

        if encoded.len() <= config.max_bytes || floor_reached {
            info!(
                "Compressed to {:.2} MB (quality: {})",
                encoded.len() as f64 / 1024.0 / 1024.0,
                quality
            );
            return Ok(TransformOutput {
                bytes: encoded,
                width,
                height,
                quality,
                floor_reached,
            });
        }

        quality = quality.saturating_sub(step).max(floor);
    }
}
