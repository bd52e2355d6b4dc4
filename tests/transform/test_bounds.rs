// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use picrelay::transform::{transform, TransformConfig, TransformError};
use rand::{Rng, SeedableRng};
use std::io::Cursor;

/// Noisy image that compresses poorly, encoded as PNG
fn noisy_png(width: u32, height: u32, seed: u64) -> Vec<u8> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let img = RgbImage::from_fn(width, height, |x, y| {
        let base = ((x + y) % 256) as u8;
        Rgb([
            base.wrapping_add(rng.gen_range(0..64)),
            rng.gen(),
            base.wrapping_sub(rng.gen_range(0..64)),
        ])
    });
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    buf.into_inner()
}

fn assert_within_bounds(bytes: &[u8], config: &TransformConfig) {
    let out = transform(bytes, config).unwrap();

    let decoded = image::load_from_memory(&out.bytes).expect("output must decode");
    assert_eq!((decoded.width(), decoded.height()), (out.width, out.height));
    assert!(out.width.max(out.height) <= config.max_dimension);
    assert!(out.fits(config.max_bytes) || out.quality == config.quality_floor);
    assert!(out.quality >= config.quality_floor && out.quality <= config.start_quality);
}

#[test]
fn test_scaled_oversized_input_terminates_within_bounds() {
    // Same shape as a 20000x15000 input against a 4950px / 9MB ceiling, scaled down
    let config = TransformConfig {
        max_bytes: 180 * 1024,
        max_dimension: 495,
        start_quality: 100,
        quality_step: 1,
        quality_floor: 50,
        ..Default::default()
    };
    assert_within_bounds(&noisy_png(2000, 1500, 1), &config);
}

#[test]
fn test_unreachable_budget_stops_at_floor() {
    let config = TransformConfig {
        max_bytes: 512,
        max_dimension: 300,
        start_quality: 95,
        quality_step: 5,
        quality_floor: 40,
        ..Default::default()
    };
    let out = transform(&noisy_png(600, 400, 2), &config).unwrap();
    assert!(out.floor_reached);
    assert_eq!(out.quality, 40);
    assert_eq!((out.width, out.height), (300, 200));
    assert!(image::load_from_memory(&out.bytes).is_ok());
}

#[test]
fn test_truncated_input_is_error() {
    let mut bytes = noisy_png(64, 64, 3);
    bytes.truncate(40);
    assert!(matches!(
        transform(&bytes, &TransformConfig::default()),
        Err(TransformError::Image(_))
    ));
}

#[test]
fn test_full_size_input_within_default_ceilings() {
    // Decodes to 900 MB, past the decoder's built-in 512 MiB allocation cap
    let img = RgbImage::from_pixel(20000, 15000, Rgb([120, 140, 90]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Png)
        .unwrap();
    let bytes = buf.into_inner();

    let config = TransformConfig::default();
    assert_eq!(config.max_dimension, 4950);
    assert_eq!(config.max_bytes, 9 * 1024 * 1024);

    let out = transform(&bytes, &config).expect("full-size source should transform");
    assert_eq!(out.width, 4950);
    assert!((3712..=3713).contains(&out.height));
    assert!(out.fits(config.max_bytes));
    assert!(image::load_from_memory(&out.bytes).is_ok());
}
