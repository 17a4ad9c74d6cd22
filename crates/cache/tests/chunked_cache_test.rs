//! End-to-end behaviour of the chunked cache against the reference stores

use async_trait::async_trait;
use fragcache::{
    fragment_key, metadata_key, CacheError, ChunkedCache, ChunkedCacheBuilder, DiskStore,
    MemoryStore, Result, Store, MAX_FRAGMENT_COUNT, MAX_PREFIX_BYTES,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Article {
    id: u32,
    title: String,
    body: String,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Articles whose text makes several 64-byte fragments, tagged with the call number
fn articles(generation: usize) -> Vec<Article> {
    (0..8)
        .map(|id| Article {
            id,
            title: format!("Article {id} / generation {generation}"),
            body: "Zürich → Kyōto 🚄 ".repeat(3),
        })
        .collect()
}

struct Harness {
    store: MemoryStore,
    calls: Arc<AtomicUsize>,
    cache: ChunkedCache<Vec<Article>>,
}

fn harness(max_fragment_bytes: usize) -> Harness {
    init_tracing();
    let store = MemoryStore::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let producer_calls = Arc::clone(&calls);
    let cache = ChunkedCacheBuilder::new("articles")
        .with_max_fragment_bytes(max_fragment_bytes)
        .build(store.clone(), move || {
            let generation = producer_calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Ok::<_, std::io::Error>(articles(generation)) }
        })
        .unwrap();
    Harness { store, calls, cache }
}

async fn fragment_count(store: &MemoryStore, prefix: &str) -> usize {
    let meta = store.get(&metadata_key(prefix)).await.unwrap().unwrap();
    let value: serde_json::Value = serde_json::from_str(&meta).unwrap();
    value["fragmentCount"].as_u64().unwrap() as usize
}

#[tokio::test]
async fn test_miss_then_hit() {
    let h = harness(64);

    let first = h.cache.get().await.unwrap();
    assert_eq!(first, articles(1));
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);
    assert!(fragment_count(&h.store, "articles").await > 1);

    let second = h.cache.get().await.unwrap();
    assert_eq!(second, first);
    assert_eq!(h.calls.load(Ordering::SeqCst), 1);

    let stats = h.cache.statistics();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.producer_calls, 1);
    assert_eq!(stats.hit_rate(), 0.5);
}

#[tokio::test]
async fn test_losing_any_single_fragment_triggers_refetch() {
    let h = harness(64);
    h.cache.get().await.unwrap();
    let count = fragment_count(&h.store, "articles").await;

    for index in 0..count {
        let before = h.calls.load(Ordering::SeqCst);
        assert!(h.store.remove(&fragment_key("articles", index)));

        let value = h.cache.get().await.unwrap();
        assert_eq!(h.calls.load(Ordering::SeqCst), before + 1);
        assert_eq!(value, articles(before + 1));
    }

    assert_eq!(h.cache.statistics().partial_misses, count as u64);
}

#[tokio::test]
async fn test_losing_metadata_triggers_refetch() {
    let h = harness(64);
    h.cache.get().await.unwrap();

    assert!(h.store.remove(&metadata_key("articles")));
    let value = h.cache.get().await.unwrap();
    assert_eq!(value, articles(2));
    assert_eq!(h.calls.load(Ordering::SeqCst), 2);
    assert_eq!(h.cache.statistics().partial_misses, 0);

    // The rewrite restored a complete entry set
    assert_eq!(h.cache.get().await.unwrap(), articles(2));
    assert_eq!(h.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_corrupted_fragment_triggers_refetch() {
    let h = harness(64);
    h.cache.get().await.unwrap();

    assert!(h.store.corrupt(&fragment_key("articles", 1), "\u{0}garbage"));
    assert_eq!(h.cache.get().await.unwrap(), articles(2));
    assert_eq!(h.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_reordered_fragments_trigger_refetch() {
    let h = harness(64);
    h.cache.get().await.unwrap();

    let first = h.store.get(&fragment_key("articles", 0)).await.unwrap().unwrap();
    let second = h.store.get(&fragment_key("articles", 1)).await.unwrap().unwrap();
    assert_ne!(first, second);
    h.store.corrupt(&fragment_key("articles", 0), second);
    h.store.corrupt(&fragment_key("articles", 1), first);

    assert_eq!(h.cache.get().await.unwrap(), articles(2));
    assert_eq!(h.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_metadata_claiming_extra_fragments_triggers_refetch() {
    let h = harness(64);
    h.cache.get().await.unwrap();
    let count = fragment_count(&h.store, "articles").await;

    h.store.corrupt(
        &metadata_key("articles"),
        format!("{{\"fragmentCount\":{}}}", count + 1),
    );
    assert_eq!(h.cache.get().await.unwrap(), articles(2));
}

#[tokio::test]
async fn test_implausible_fragment_counts_fall_back_to_producer() {
    let h = harness(64);

    for claimed in [
        u64::MAX.to_string(),
        (MAX_FRAGMENT_COUNT + 1).to_string(),
        "1e9".to_string(),
        "\"3\"".to_string(),
    ] {
        h.store
            .put(
                &metadata_key("articles"),
                format!("{{\"fragmentCount\":{claimed}}}"),
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        let before = h.calls.load(Ordering::SeqCst);
        assert_eq!(h.cache.get().await.unwrap(), articles(before + 1));
        assert_eq!(h.calls.load(Ordering::SeqCst), before + 1);
    }

    // Each fallback rewrote a valid record, so the next read hits
    let calls = h.calls.load(Ordering::SeqCst);
    assert_eq!(h.cache.get().await.unwrap(), articles(calls));
    assert_eq!(h.calls.load(Ordering::SeqCst), calls);
}

#[tokio::test]
async fn test_longest_prefix_round_trips() {
    init_tracing();
    let store = MemoryStore::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let producer_calls = Arc::clone(&calls);
    let cache: ChunkedCache<Vec<Article>> =
        ChunkedCacheBuilder::new("p".repeat(MAX_PREFIX_BYTES))
            .with_max_fragment_bytes(64)
            .build(store.clone(), move || {
                producer_calls.fetch_add(1, Ordering::SeqCst);
                async move { Ok::<_, std::io::Error>(articles(1)) }
            })
            .unwrap();

    assert_eq!(cache.get().await.unwrap(), articles(1));
    assert_eq!(cache.get().await.unwrap(), articles(1));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.statistics().write_failures, 0);
}

#[test]
fn test_prefix_too_long_for_derived_keys_is_rejected() {
    let result: Result<ChunkedCache<Vec<Article>>> = ChunkedCacheBuilder::new(
        "p".repeat(MAX_PREFIX_BYTES + 1),
    )
    .build(MemoryStore::new(), || async {
        Ok::<_, std::io::Error>(articles(1))
    });
    assert!(matches!(result, Err(CacheError::InvalidKey { .. })));
}

#[tokio::test]
async fn test_producer_failure_propagates() {
    init_tracing();
    let store = MemoryStore::new();
    let cache: ChunkedCache<Vec<Article>> = ChunkedCache::new("articles", store.clone(), || async {
        Err::<Vec<Article>, _>(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "upstream down",
        ))
    })
    .unwrap();

    let err = cache.get().await.unwrap_err();
    assert!(err.is_producer_failure());
    match err {
        CacheError::Producer { prefix, source, .. } => {
            assert_eq!(prefix, "articles");
            let io = source.downcast_ref::<std::io::Error>().unwrap();
            assert_eq!(io.kind(), std::io::ErrorKind::ConnectionRefused);
        }
        other => panic!("expected producer error, got {other:?}"),
    }

    assert!(store.is_empty());
    assert_eq!(cache.statistics().producer_failures, 1);
}

#[tokio::test]
async fn test_payload_smaller_than_bound_uses_one_fragment() {
    let h = harness(1024 * 1024);
    h.cache.get().await.unwrap();
    assert_eq!(fragment_count(&h.store, "articles").await, 1);
    assert_eq!(h.store.len(), 2);
}

#[tokio::test]
async fn test_multibyte_payload_near_boundary() {
    init_tracing();
    // Every scalar here is 3 or 4 bytes wide, so most 7-byte boundaries fall mid-character
    let payload: String = "€𝄞".repeat(100);
    let store = MemoryStore::with_max_entry_bytes(64);
    let expected = payload.clone();
    let cache: ChunkedCache<String> = ChunkedCacheBuilder::new("glyphs")
        .with_max_fragment_bytes(7)
        .build(store.clone(), move || {
            let payload = payload.clone();
            async move { Ok::<_, std::io::Error>(payload) }
        })
        .unwrap();

    assert_eq!(cache.get().await.unwrap(), expected);
    assert_eq!(cache.statistics().write_failures, 0);

    let count = fragment_count(&store, "glyphs").await;
    for index in 0..count {
        let fragment = store.get(&fragment_key("glyphs", index)).await.unwrap().unwrap();
        assert!(fragment.len() <= 7);
    }

    assert_eq!(cache.get().await.unwrap(), expected);
    assert_eq!(cache.statistics().hits, 1);
}

/// Store whose writes can be made to fail, for store-back failure paths
#[derive(Debug, Clone, Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_fragment_writes: Arc<AtomicBool>,
    fail_reads: Arc<AtomicBool>,
}

#[async_trait]
impl Store for FlakyStore {
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        if self.fail_fragment_writes.load(Ordering::SeqCst) && !key.ends_with(":metadata") {
            return Err(CacheError::store(key, "put", "quota exceeded"));
        }
        self.inner.put(key, value, ttl).await
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(CacheError::store(key, "get", "timeout"));
        }
        self.inner.get(key).await
    }

    fn max_entry_bytes(&self) -> Option<usize> {
        self.inner.max_entry_bytes()
    }
}

#[tokio::test]
async fn test_failed_store_back_still_returns_fresh_data() {
    init_tracing();
    let store = FlakyStore::default();
    store.fail_fragment_writes.store(true, Ordering::SeqCst);
    let calls = Arc::new(AtomicUsize::new(0));
    let producer_calls = Arc::clone(&calls);
    let cache: ChunkedCache<Vec<Article>> = ChunkedCacheBuilder::new("articles")
        .with_max_fragment_bytes(64)
        .build(store.clone(), move || {
            let generation = producer_calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Ok::<_, std::io::Error>(articles(generation)) }
        })
        .unwrap();

    assert_eq!(cache.get().await.unwrap(), articles(1));
    let stats = cache.statistics();
    assert!(stats.write_failures > 1);
    assert_eq!(stats.fragments_written, 0);

    // Metadata landed without fragments: next read is a miss, not corrupt data
    assert_eq!(cache.get().await.unwrap(), articles(2));
    assert_eq!(cache.statistics().partial_misses, 1);

    store.fail_fragment_writes.store(false, Ordering::SeqCst);
    assert_eq!(cache.get().await.unwrap(), articles(3));
    assert_eq!(cache.get().await.unwrap(), articles(3));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_read_failures_are_misses() {
    init_tracing();
    let store = FlakyStore::default();
    let calls = Arc::new(AtomicUsize::new(0));
    let producer_calls = Arc::clone(&calls);
    let cache: ChunkedCache<Vec<Article>> = ChunkedCache::new("articles", store.clone(), move || {
        let generation = producer_calls.fetch_add(1, Ordering::SeqCst) + 1;
        async move { Ok::<_, std::io::Error>(articles(generation)) }
    })
    .unwrap();

    cache.get().await.unwrap();
    store.fail_reads.store(true, Ordering::SeqCst);
    assert_eq!(cache.get().await.unwrap(), articles(2));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_entries_expire_after_revalidate() {
    init_tracing();
    let store = MemoryStore::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let producer_calls = Arc::clone(&calls);
    let cache: ChunkedCache<Vec<Article>> = ChunkedCacheBuilder::new("articles")
        .with_revalidate(Duration::from_secs(30))
        .with_max_fragment_bytes(64)
        .build(store, move || {
            let generation = producer_calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Ok::<_, std::io::Error>(articles(generation)) }
        })
        .unwrap();

    cache.get().await.unwrap();
    tokio::time::advance(Duration::from_secs(10)).await;
    assert_eq!(cache.get().await.unwrap(), articles(1));

    tokio::time::advance(Duration::from_secs(30)).await;
    assert_eq!(cache.get().await.unwrap(), articles(2));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_flight_produces_once() {
    init_tracing();
    let store = MemoryStore::new();
    let calls = Arc::new(AtomicUsize::new(0));
    let producer_calls = Arc::clone(&calls);
    let cache: ChunkedCache<Vec<Article>> = ChunkedCacheBuilder::new("articles")
        .with_max_fragment_bytes(64)
        .with_single_flight(true)
        .build(store, move || {
            let generation = producer_calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<_, std::io::Error>(articles(generation))
            }
        })
        .unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.get().await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), articles(1));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_misses_without_single_flight_all_succeed() {
    let h = harness(64);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = h.cache.clone();
            tokio::spawn(async move { cache.get().await })
        })
        .collect();

    for handle in handles {
        let value = handle.await.unwrap().unwrap();
        assert_eq!(value.len(), 8);
    }
    let calls = h.calls.load(Ordering::SeqCst);
    assert!((1..=8).contains(&calls));

    // Whichever write landed last, the stored value is complete and readable
    let settled = h.cache.get().await.unwrap();
    assert_eq!(h.calls.load(Ordering::SeqCst), calls);
    assert_eq!(settled.len(), 8);
}

#[tokio::test]
async fn test_disk_store_end_to_end() {
    init_tracing();
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(DiskStore::new(temp_dir.path()));
    let calls = Arc::new(AtomicUsize::new(0));
    let producer_calls = Arc::clone(&calls);
    let cache: ChunkedCache<Vec<Article>> = ChunkedCacheBuilder::new("articles")
        .with_max_fragment_bytes(64)
        .build(Arc::clone(&store), move || {
            let generation = producer_calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Ok::<_, std::io::Error>(articles(generation)) }
        })
        .unwrap();

    assert_eq!(cache.get().await.unwrap(), articles(1));
    assert_eq!(cache.get().await.unwrap(), articles(1));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    assert!(store.remove(&fragment_key("articles", 0)).await.unwrap());
    assert_eq!(cache.get().await.unwrap(), articles(2));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
