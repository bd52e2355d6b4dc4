// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use picrelay::history::{HistoryCache, HistoryConfig};
use picrelay::store::{HistoryRecord, InsertOutcome, MockStore, PersistentStore};
use std::sync::Arc;
use std::time::Duration;

fn record(key: &str, preview: &str) -> HistoryRecord {
    HistoryRecord {
        key: key.to_string(),
        preview_ref: preview.to_string(),
        original_ref: String::new(),
        caption: format!("caption {}", key),
        tags: "sky".to_string(),
        source_tag: "yande".to_string(),
        width: 100,
        height: 100,
        created_at: 1_700_000_000,
    }
}

fn cache(store: &MockStore) -> Arc<HistoryCache> {
    let store: Arc<dyn PersistentStore> = Arc::new(store.clone());
    Arc::new(HistoryCache::new(store, HistoryConfig::default()))
}

#[tokio::test]
async fn test_two_caches_racing_on_one_key_store_one_record() {
    let store = MockStore::new();
    store.set_latency(Some(Duration::from_millis(20))).await;
    let first = cache(&store);
    let second = cache(&store);

    // Both callers see a miss before either commits
    let (a, b) = tokio::join!(first.check_exists("yande_1"), second.check_exists("yande_1"));
    assert!(!a && !b);

    let record_a = record("yande_1", "preview-a");
    let record_b = record("yande_1", "preview-b");
    let (a, b) = tokio::join!(first.commit(&record_a), second.commit(&record_b));
    let outcomes = [a.unwrap(), b.unwrap()];

    assert_eq!(store.record_count().await, 1);
    assert_eq!(store.inserted_count(), 1);
    assert_eq!(
        outcomes
            .iter()
            .filter(|o| **o == InsertOutcome::Inserted)
            .count(),
        1
    );
    assert!(first.check_exists("yande_1").await);
    assert!(second.check_exists("yande_1").await);
}

#[tokio::test]
async fn test_many_concurrent_committers() {
    let store = MockStore::new();
    store.set_latency(Some(Duration::from_millis(5))).await;
    let shared = cache(&store);

    let mut handles = Vec::new();
    for i in 0..16 {
        let cache = if i % 2 == 0 { shared.clone() } else { cache(&store) };
        handles.push(tokio::spawn(async move {
            if !cache.check_exists("danbooru_9").await {
                cache
                    .commit(&record("danbooru_9", &format!("preview-{}", i)))
                    .await
                    .ok();
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(store.record_count().await, 1);
    assert_eq!(store.inserted_count(), 1);
}

#[tokio::test]
async fn test_first_record_wins() {
    let store = MockStore::new();
    let cache = cache(&store);

    cache.commit(&record("yande_2", "first")).await.unwrap();
    let second = cache.commit(&record("yande_2", "second")).await.unwrap();

    assert_eq!(second, InsertOutcome::AlreadyPresent);
    assert_eq!(store.record("yande_2").await.unwrap().preview_ref, "first");
}
