// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use picrelay::channel::{AssetKind, ChannelError, RecordingChannel};
use picrelay::history::{HistoryCache, HistoryConfig};
use picrelay::publish::{CandidateItem, PublishConfig, PublishError, PublishOutcome, PublishPipeline};
use picrelay::store::MockStore;
use picrelay::transform::TransformConfig;
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

fn jpeg(width: u32, height: u32) -> Bytes {
    let img = RgbImage::from_pixel(width, height, Rgb([10, 90, 160]));
    let mut buf = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, ImageFormat::Jpeg)
        .unwrap();
    Bytes::from(buf.into_inner())
}

fn item(key: &str) -> CandidateItem {
    CandidateItem {
        key: key.to_string(),
        source_tag: "danbooru".to_string(),
        image_bytes: jpeg(64, 64),
        width: 64,
        height: 64,
        caption: format!("Danbooru: {}", key),
        tags: "scenery".to_string(),
    }
}

fn setup() -> (MockStore, RecordingChannel, Arc<HistoryCache>, PublishPipeline) {
    let store = MockStore::new();
    let channel = RecordingChannel::new();
    let cache = Arc::new(HistoryCache::new(
        Arc::new(store.clone()),
        HistoryConfig::default(),
    ));
    let pipeline = PublishPipeline::new(
        cache.clone(),
        Arc::new(channel.clone()),
        TransformConfig::default(),
        PublishConfig {
            send_interval: Duration::ZERO,
            ..Default::default()
        },
    );
    (store, channel, cache, pipeline)
}

#[tokio::test]
async fn test_original_send_failure_commits_preview_only() {
    let (store, channel, cache, pipeline) = setup();
    channel.set_failing(AssetKind::Document, true);

    let outcome = pipeline.publish(item("danbooru_1")).await;
    let record = match outcome {
        PublishOutcome::Published(record) => record,
        other => panic!("expected a preview-only publish, got {:?}", other),
    };

    assert!(!record.preview_ref.is_empty());
    assert!(record.original_ref.is_empty());
    assert!(cache.check_exists("danbooru_1").await);
    assert_eq!(store.record("danbooru_1").await, Some(record));
    assert_eq!(channel.sent_of(AssetKind::Document).await.len(), 0);
}

#[tokio::test]
async fn test_preview_send_failure_commits_nothing_and_retries() {
    let (store, channel, cache, pipeline) = setup();
    channel
        .fail_next(
            AssetKind::Photo,
            ChannelError::RateLimited {
                retry_after_secs: 3,
            },
        )
        .await;

    let outcome = pipeline.publish(item("danbooru_2")).await;
    assert!(matches!(
        outcome,
        PublishOutcome::Skipped(PublishError::PreviewSend(ChannelError::RateLimited { .. }))
    ));
    assert_eq!(store.record_count().await, 0);
    assert!(!cache.contains_local("danbooru_2").await);
    assert!(channel.sent_of(AssetKind::Document).await.is_empty());

    // Next poll cycle
    assert!(pipeline.publish(item("danbooru_2")).await.is_published());
    assert_eq!(store.record_count().await, 1);
}

#[tokio::test]
async fn test_stored_record_fields() {
    let (store, _channel, _cache, pipeline) = setup();
    assert!(pipeline.publish(item("danbooru_3")).await.is_published());

    let record = store.record("danbooru_3").await.unwrap();
    assert_eq!(record.caption, "Danbooru: danbooru_3");
    assert_eq!(record.stored_tags(), "scenery danbooru");
    assert_eq!((record.width, record.height), (64, 64));
    assert!(record.created_at > 0);
}
