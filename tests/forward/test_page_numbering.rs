// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use picrelay::channel::{AssetRef, RecordingChannel};
use picrelay::forward::{ForwardConfig, ForwardController, ForwardState, OperatorId, StagedAsset};
use picrelay::history::{HistoryCache, HistoryConfig};
use picrelay::publish::{PublishConfig, PublishPipeline};
use picrelay::store::MockStore;
use picrelay::transform::TransformConfig;
use std::sync::Arc;
use std::time::Duration;

const OPERATOR: OperatorId = OperatorId(6874581126);

fn controller(store: &MockStore, channel: &RecordingChannel) -> ForwardController {
    let cache = Arc::new(HistoryCache::new(
        Arc::new(store.clone()),
        HistoryConfig::default(),
    ));
    let pipeline = Arc::new(PublishPipeline::new(
        cache,
        Arc::new(channel.clone()),
        TransformConfig::default(),
        PublishConfig {
            send_interval: Duration::ZERO,
            ..Default::default()
        },
    ));
    ForwardController::new(
        pipeline,
        ForwardConfig {
            operators: vec![OPERATOR],
            ..Default::default()
        },
    )
}

fn staged(id: &str) -> StagedAsset {
    StagedAsset::new(AssetRef::new(id), 1280, 720)
}

#[tokio::test]
async fn test_pages_commit_as_p0_p1_p2() {
    let store = MockStore::new();
    let channel = RecordingChannel::new();
    let forward = controller(&store, &channel);

    let session = forward.start(OPERATOR, "Title", "#tag", Some(500)).await.unwrap();
    let base_id = session.base_id().to_string();
    assert_eq!(base_id, "manual_500");

    let state = forward.stage_preview(OPERATOR, staged("a"), false).await.unwrap();
    assert_eq!(state, ForwardState::Ready);
    let page = forward.continue_session(OPERATOR).await.unwrap();
    assert_eq!(page.key, format!("{}_p0", base_id));

    forward.stage_preview(OPERATOR, staged("b"), false).await.unwrap();
    let page = forward.continue_session(OPERATOR).await.unwrap();
    assert_eq!(page.key, format!("{}_p1", base_id));

    forward.stage_preview(OPERATOR, staged("c"), false).await.unwrap();
    let end = forward.end(OPERATOR).await.unwrap();
    assert_eq!(end.final_page.unwrap().key, format!("{}_p2", base_id));
    assert!(end.final_error.is_none());

    for page in 0..3 {
        let key = format!("{}_p{}", base_id, page);
        let record = store.record(&key).await.unwrap();
        assert_eq!(record.caption, format!("Title [P{}]\n#tag", page));
        assert_eq!(record.tags, "#tag");
        assert_eq!(record.source_tag, "TG-Forward");
    }
    assert_eq!(store.record_count().await, 3);
    assert_eq!(forward.snapshot().await.state(), ForwardState::Idle);
}

#[tokio::test]
async fn test_end_without_staged_preview_commits_nothing() {
    let store = MockStore::new();
    let channel = RecordingChannel::new();
    let forward = controller(&store, &channel);

    forward.start(OPERATOR, "Title", "", Some(501)).await.unwrap();
    forward.stage_preview(OPERATOR, staged("a"), false).await.unwrap();
    forward.continue_session(OPERATOR).await.unwrap();

    let end = forward.end(OPERATOR).await.unwrap();
    assert!(end.was_active);
    assert!(end.final_page.is_none());
    assert_eq!(store.record_count().await, 1);
}

#[tokio::test]
async fn test_start_overwrites_active_session() {
    let store = MockStore::new();
    let channel = RecordingChannel::new();
    let forward = controller(&store, &channel);

    forward.start(OPERATOR, "First", "", Some(600)).await.unwrap();
    forward.stage_preview(OPERATOR, staged("a"), false).await.unwrap();
    forward.continue_session(OPERATOR).await.unwrap();
    forward.stage_preview(OPERATOR, staged("b"), true).await.unwrap();

    let session = forward.start(OPERATOR, "Second", "#new", Some(601)).await.unwrap();
    assert_eq!(session.base_id(), "manual_601");
    assert_eq!(session.page_index(), 0);
    assert_eq!(session.state(), ForwardState::AwaitingPreview);
    assert!(session.staged_preview().is_none());
    assert_eq!(session.title(), "Second");

    // The abandoned page was never committed
    assert!(store.record("manual_600_p1").await.is_none());
}

#[tokio::test]
async fn test_distinct_original_is_recorded() {
    let store = MockStore::new();
    let channel = RecordingChannel::new();
    let forward = controller(&store, &channel);

    forward.start(OPERATOR, "", "", Some(700)).await.unwrap();
    assert_eq!(
        forward.stage_preview(OPERATOR, staged("preview"), true).await.unwrap(),
        ForwardState::AwaitingOriginal
    );
    assert_eq!(
        forward.stage_original(OPERATOR, staged("original")).await.unwrap(),
        ForwardState::Ready
    );
    let page = forward.continue_session(OPERATOR).await.unwrap();

    let record = page.record.unwrap();
    assert_eq!(record.preview_ref, "preview");
    assert_eq!(record.original_ref, "original");
    assert_eq!(record.caption, "MtcACG:TG [P0]");
    assert_eq!(record.tags, "TG-Forward");
}

#[tokio::test]
async fn test_manual_and_polled_keys_share_history() {
    let store = MockStore::new();
    let channel = RecordingChannel::new();
    let forward = controller(&store, &channel);

    forward.start(OPERATOR, "T", "", Some(800)).await.unwrap();
    forward.stage_preview(OPERATOR, staged("a"), false).await.unwrap();
    forward.continue_session(OPERATOR).await.unwrap();

    // A second controller over the same store sees the page as published
    let other = controller(&store, &channel);
    other.start(OPERATOR, "T", "", Some(800)).await.unwrap();
    other.stage_preview(OPERATOR, staged("z"), false).await.unwrap();
    let page = other.continue_session(OPERATOR).await.unwrap();
    assert!(page.record.is_none());
    assert_eq!(store.record("manual_800_p0").await.unwrap().preview_ref, "a");
}
