// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use picrelay::channel::{AssetRef, RecordingChannel};
use picrelay::forward::{
    CommandReply, ForwardConfig, ForwardController, ForwardError, OperatorConsole, OperatorId,
    StagedAsset,
};
use picrelay::history::{HistoryCache, HistoryConfig};
use picrelay::publish::{PublishConfig, PublishPipeline};
use picrelay::store::{HistoryRecord, MockStore};
use picrelay::transform::TransformConfig;
use std::sync::Arc;
use std::time::Duration;

const OPERATOR: OperatorId = OperatorId(8040798522);
const STRANGER: OperatorId = OperatorId(42);

struct Harness {
    store: MockStore,
    controller: Arc<ForwardController>,
    console: OperatorConsole,
}

fn harness() -> Harness {
    let store = MockStore::new();
    let cache = Arc::new(HistoryCache::new(
        Arc::new(store.clone()),
        HistoryConfig::default(),
    ));
    let pipeline = Arc::new(PublishPipeline::new(
        cache.clone(),
        Arc::new(RecordingChannel::new()),
        TransformConfig::default(),
        PublishConfig {
            send_interval: Duration::ZERO,
            ..Default::default()
        },
    ));
    let controller = Arc::new(ForwardController::new(
        pipeline,
        ForwardConfig {
            operators: vec![OPERATOR],
            ..Default::default()
        },
    ));
    let console = OperatorConsole::new(controller.clone(), cache);
    Harness {
        store,
        controller,
        console,
    }
}

#[tokio::test]
async fn test_start_command_uses_origin_id() {
    let h = harness();
    let reply = h
        .console
        .handle(OPERATOR, Some(1234), "/forward_start Night city #neon #rain")
        .await
        .unwrap();

    match reply {
        CommandReply::Started {
            base_id,
            title,
            tags,
        } => {
            assert_eq!(base_id, "manual_1234");
            assert_eq!(title, "Night city");
            assert_eq!(tags, "#neon #rain");
        }
        other => panic!("unexpected reply: {:?}", other),
    }
    assert!(h.controller.snapshot().await.is_active());
}

#[tokio::test]
async fn test_stranger_is_rejected_without_state_change() {
    let h = harness();
    let reply = h
        .console
        .handle(STRANGER, Some(1), "/forward_start Title")
        .await
        .unwrap();

    assert!(matches!(
        reply,
        CommandReply::Rejected(ForwardError::Unauthorized { .. })
    ));
    assert!(!h.controller.snapshot().await.is_active());

    let reply = h.console.handle(STRANGER, None, "/delete yande_1").await.unwrap();
    assert!(matches!(reply, CommandReply::Rejected(_)));
    assert_eq!(h.store.calls().delete, 0);
}

#[tokio::test]
async fn test_continue_and_end_flow() {
    let h = harness();
    h.console
        .handle(OPERATOR, Some(77), "/forward_start Set")
        .await
        .unwrap();
    h.controller
        .stage_preview(OPERATOR, StagedAsset::new(AssetRef::new("p0"), 10, 10), false)
        .await
        .unwrap();

    match h.console.handle(OPERATOR, None, "/forward_continue").await.unwrap() {
        CommandReply::PageCommitted { page, next_page } => {
            assert_eq!(page.key, "manual_77_p0");
            assert_eq!(next_page, 1);
        }
        other => panic!("unexpected reply: {:?}", other),
    }

    match h.console.handle(OPERATOR, None, "/forward_end").await.unwrap() {
        CommandReply::Ended {
            final_page,
            final_error,
        } => {
            assert!(final_page.is_none());
            assert!(final_error.is_none());
        }
        other => panic!("unexpected reply: {:?}", other),
    }

    assert!(matches!(
        h.console.handle(OPERATOR, None, "/forward_end").await.unwrap(),
        CommandReply::NoActiveSession
    ));
    assert!(matches!(
        h.console.handle(OPERATOR, None, "/forward_continue").await.unwrap(),
        CommandReply::NoActiveSession
    ));
}

#[tokio::test]
async fn test_delete_command() {
    let h = harness();
    h.store
        .seed_record(HistoryRecord {
            key: "pixiv_114514_p0".to_string(),
            preview_ref: "p".to_string(),
            original_ref: String::new(),
            caption: String::new(),
            tags: String::new(),
            source_tag: "pixiv".to_string(),
            width: 1,
            height: 1,
            created_at: 0,
        })
        .await;

    let reply = h
        .console
        .handle(OPERATOR, None, "/delete pixiv_114514_p0")
        .await
        .unwrap();
    assert!(matches!(reply, CommandReply::Deleted { ref key } if key == "pixiv_114514_p0"));
    assert!(h.store.record("pixiv_114514_p0").await.is_none());

    assert!(matches!(
        h.console.handle(OPERATOR, None, "/delete").await.unwrap(),
        CommandReply::Usage(_)
    ));
}

#[tokio::test]
async fn test_plain_text_is_ignored() {
    let h = harness();
    assert!(h.console.handle(OPERATOR, None, "nice picture").await.is_none());
    assert!(h.console.handle(STRANGER, None, "/help").await.is_none());
}
