// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use picrelay::history::{HistoryCache, HistoryConfig};
use picrelay::store::{MockStore, PersistentStore, StoreError};
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

fn cache_with(store: &MockStore, config: HistoryConfig) -> HistoryCache {
    let store: Arc<dyn PersistentStore> = Arc::new(store.clone());
    HistoryCache::new(store, config)
}

#[tokio::test]
async fn test_loaded_keys_hit_without_remote_calls() {
    let store = MockStore::new();
    store
        .seed_key_list(["yande_1", "danbooru_2", "manual_3_p0"])
        .await;
    let cache = cache_with(&store, HistoryConfig::default());

    let loaded = assert_ok!(cache.load_initial().await);
    assert_eq!(loaded, 3);

    for key in ["yande_1", "danbooru_2", "manual_3_p0"] {
        assert!(cache.check_exists(key).await, "{} should be known", key);
    }
    assert_eq!(store.calls().exists, 0);
    assert_eq!(cache.stats().await.remote_lookups, 0);
}

#[tokio::test]
async fn test_unknown_key_goes_remote_once() {
    let store = MockStore::new();
    let cache = cache_with(&store, HistoryConfig::default());
    assert_ok!(cache.load_initial().await);

    assert!(!cache.check_exists("yande_404").await);
    assert!(!cache.check_exists("yande_404").await);
    assert_eq!(store.calls().exists, 2);
}

#[tokio::test]
async fn test_unreachable_store_fails_open() {
    let store = MockStore::new();
    store.seed_key_list(["yande_1"]).await;
    let cache = cache_with(&store, HistoryConfig::default());
    assert_ok!(cache.load_initial().await);

    store.set_unreachable(true);
    assert!(!cache.check_exists("yande_2").await);
    assert!(cache.check_exists("yande_1").await);
    assert_eq!(cache.stats().await.unresolved_lookups, 1);
}

#[tokio::test]
async fn test_fail_closed_when_configured() {
    let store = MockStore::new();
    let cache = cache_with(
        &store,
        HistoryConfig {
            fail_open: false,
            ..Default::default()
        },
    );

    store.set_unreachable(true);
    assert!(cache.check_exists("yande_2").await);

    store.set_unreachable(false);
    store.set_indeterminate(true);
    assert!(cache.check_exists("yande_3").await);
}

#[tokio::test]
async fn test_startup_failure_soft_and_strict() {
    let store = MockStore::new();
    store.set_unreachable(true);

    let soft = cache_with(&store, HistoryConfig::default());
    assert_eq!(assert_ok!(soft.load_initial().await), 0);
    assert!(soft.is_empty().await);

    let strict = cache_with(
        &store,
        HistoryConfig {
            strict_startup: true,
            ..Default::default()
        },
    );
    let err = assert_err!(strict.load_initial().await);
    assert!(matches!(err, StoreError::Network(_)));
}

#[tokio::test]
async fn test_delete_removes_remote_and_local() {
    let store = MockStore::new();
    store.seed_key_list(["yande_5"]).await;
    let cache = cache_with(&store, HistoryConfig::default());
    assert_ok!(cache.load_initial().await);

    assert_ok!(cache.delete("yande_5").await);
    assert!(!cache.contains_local("yande_5").await);
    assert!(!cache.check_exists("yande_5").await);
    assert_eq!(store.calls().delete, 1);
}
