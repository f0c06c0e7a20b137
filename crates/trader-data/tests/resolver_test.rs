//! 캔들 윈도우 해석 통합 테스트.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use serde_json::{json, Value};
use trader_core::{
    BlobStore, Candle, CandleProvider, KlineCacheReference, ProviderError, StoreError, Timeframe,
};
use trader_data::{
    keys::{job_key, window_key},
    CandleSource, DataError, InMemoryBlobStore, JobKlineLoader, KlineResolver, ResolverConfig,
    WindowRequest,
};

const MIN: i64 = 60_000;

/// 요청 커서부터 최대 `page_size`개 행을 돌려주는 제공자.
struct PagedProvider {
    total_bars: i64,
    page_size: usize,
    calls: AtomicUsize,
}

impl PagedProvider {
    fn new(total_bars: i64, page_size: usize) -> Self {
        Self {
            total_bars,
            page_size,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CandleProvider for PagedProvider {
    async fn fetch(
        &self,
        _symbol: &str,
        _timeframe: Timeframe,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<Value>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        Ok((0..self.total_bars)
            .map(|i| i * MIN)
            .filter(|t| *t >= from_ms && *t <= to_ms)
            .take(self.page_size)
            .map(|t| json!([t, "100", "101", "99", "100.5", "5"]))
            .collect())
    }

    fn provider_name(&self) -> &str {
        "paged"
    }
}

struct FailingProvider;

#[async_trait]
impl CandleProvider for FailingProvider {
    async fn fetch(&self, _: &str, _: Timeframe, _: i64, _: i64) -> Result<Vec<Value>, ProviderError> {
        Err(ProviderError::Network("connection reset".to_string()))
    }

    fn provider_name(&self) -> &str {
        "failing"
    }
}

/// 읽기는 항상 miss, 쓰기는 항상 실패하는 저장소.
struct BrokenBlobStore;

#[async_trait]
impl BlobStore for BrokenBlobStore {
    async fn get(&self, _key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Err(StoreError::Unavailable("down".to_string()))
    }

    async fn put(&self, _key: &str, _bytes: Vec<u8>) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("down".to_string()))
    }
}

fn request<'a>(job_id: &'a str, from_ms: i64, to_ms: i64) -> WindowRequest<'a> {
    WindowRequest {
        job_id,
        symbol: "BTCUSDT",
        timeframe: Timeframe::M1,
        from_ms,
        to_ms,
    }
}

#[tokio::test]
async fn upstream_pages_are_stitched_and_persisted_under_both_keys() {
    let blobs = Arc::new(InMemoryBlobStore::new());
    let provider = Arc::new(PagedProvider::new(250, 100));
    let resolver = KlineResolver::new(blobs.clone(), provider.clone());

    let resolved = resolver
        .resolve(&request("job-1", 0, 249 * MIN), &[])
        .await
        .unwrap();

    assert_eq!(resolved.source, CandleSource::Upstream);
    assert_eq!(resolved.candles.len(), 250);
    assert!(resolved
        .candles
        .windows(2)
        .all(|w| w[0].open_time < w[1].open_time));
    // 100 + 100 + 50, 마지막 페이지에서 커서가 to_ms를 넘어 종료
    assert_eq!(provider.calls(), 3);

    let reference = resolved.reference.unwrap();
    assert_eq!(reference.key, job_key("job-1", "BTCUSDT", Timeframe::M1, 0, 249 * MIN));
    assert_eq!(reference.candle_count, 250);

    let keys = blobs.keys().await;
    assert!(keys.contains(&reference.key));
    assert!(keys.contains(&window_key("BTCUSDT", Timeframe::M1, 0, 249 * MIN)));
}

#[tokio::test]
async fn pagination_stops_at_max_pages() {
    let blobs = Arc::new(InMemoryBlobStore::new());
    let provider = Arc::new(PagedProvider::new(1_000, 10));
    let resolver = KlineResolver::new(blobs, provider.clone())
        .with_config(ResolverConfig { max_pages: 3 });

    let resolved = resolver
        .resolve(&request("job-1", 0, 999 * MIN), &[])
        .await
        .unwrap();
    assert_eq!(provider.calls(), 3);
    assert_eq!(resolved.candles.len(), 30);
}

#[tokio::test]
async fn shared_window_key_is_reused_across_jobs() {
    let blobs = Arc::new(InMemoryBlobStore::new());
    let provider = Arc::new(PagedProvider::new(50, 1_000));
    let resolver = KlineResolver::new(blobs, provider.clone());

    resolver.resolve(&request("job-a", 0, 49 * MIN), &[]).await.unwrap();
    let second = resolver
        .resolve(&request("job-b", 0, 49 * MIN), &[])
        .await
        .unwrap();

    assert_eq!(second.source, CandleSource::SharedWindow);
    assert_eq!(second.candles.len(), 50);
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn known_reference_is_preferred() {
    let blobs = Arc::new(InMemoryBlobStore::new());
    let stored: Vec<Candle> = (0..3)
        .map(|i| Candle::new(i * MIN, 1.0, 2.0, 0.5, 1.5, 1.0))
        .collect();
    blobs
        .put("custom/key.json", serde_json::to_vec(&stored).unwrap())
        .await
        .unwrap();
    let known = KlineCacheReference {
        key: "custom/key.json".to_string(),
        symbol: "btcusdt".to_string(),
        timeframe: Timeframe::M1,
        from_ms: 0,
        to_ms: 2 * MIN,
        candle_count: 3,
        url: None,
    };

    let resolver = KlineResolver::new(blobs, Arc::new(FailingProvider));
    let resolved = resolver
        .resolve(&request("job-1", 0, 2 * MIN), &[known.clone()])
        .await
        .unwrap();

    assert_eq!(resolved.source, CandleSource::KnownRef);
    assert_eq!(resolved.candles, stored);
    assert_eq!(resolved.reference.unwrap().key, known.key);
}

#[tokio::test]
async fn undecodable_known_blob_falls_through_to_upstream() {
    let blobs = Arc::new(InMemoryBlobStore::new());
    blobs.put("bad.json", b"not json".to_vec()).await.unwrap();
    let known = KlineCacheReference {
        key: "bad.json".to_string(),
        symbol: "BTCUSDT".to_string(),
        timeframe: Timeframe::M1,
        from_ms: 0,
        to_ms: 9 * MIN,
        candle_count: 10,
        url: None,
    };

    let resolver = KlineResolver::new(blobs, Arc::new(PagedProvider::new(10, 100)));
    let resolved = resolver
        .resolve(&request("job-1", 0, 9 * MIN), &[known])
        .await
        .unwrap();
    assert_eq!(resolved.source, CandleSource::Upstream);
    assert_eq!(resolved.candles.len(), 10);
}

#[tokio::test]
async fn persistence_failure_still_returns_candles_without_reference() {
    let resolver = KlineResolver::new(Arc::new(BrokenBlobStore), Arc::new(PagedProvider::new(10, 100)));
    let resolved = resolver
        .resolve(&request("job-1", 0, 9 * MIN), &[])
        .await
        .unwrap();
    assert_eq!(resolved.candles.len(), 10);
    assert!(resolved.reference.is_none());
}

#[tokio::test]
async fn upstream_failure_and_empty_window_are_errors() {
    let blobs = Arc::new(InMemoryBlobStore::new());
    let failing = KlineResolver::new(blobs.clone(), Arc::new(FailingProvider));
    let err = failing
        .resolve(&request("job-1", 0, MIN), &[])
        .await
        .unwrap_err();
    assert!(matches!(err, DataError::Upstream { .. }));
    assert!(err.is_fatal());

    let empty = KlineResolver::new(blobs, Arc::new(PagedProvider::new(0, 100)));
    let err = empty.resolve(&request("job-1", 0, MIN), &[]).await.unwrap_err();
    assert!(matches!(err, DataError::EmptyWindow { .. }));
}

#[tokio::test]
async fn loader_resolves_each_timeframe_once() {
    let blobs = Arc::new(InMemoryBlobStore::new());
    let provider = Arc::new(PagedProvider::new(20, 1_000));
    let resolver = Arc::new(KlineResolver::new(blobs, provider.clone()));
    let loader = JobKlineLoader::new(resolver, "job-1", "BTCUSDT", 0, 19 * MIN, Vec::new());

    let (a, b, c) = futures::try_join!(
        loader.load(Timeframe::M1),
        loader.load(Timeframe::M1),
        loader.load(Timeframe::M1),
    )
    .unwrap();

    assert!(Arc::ptr_eq(&a, &b) && Arc::ptr_eq(&b, &c));
    assert_eq!(provider.calls(), 1);
    assert_eq!(loader.requested_timeframes(), 1);
}
