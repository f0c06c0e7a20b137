//! 캔들 윈도우 해석기.
//!
//! # 동작 흐름
//!
//! ```text
//! 요청 (jobId, symbol, timeframe, from, to, knownRefs)
//!         │
//! ┌───────▼────────────┐
//! │ 1. 알려진 참조 조회  │ ← 정확히 같은 윈도우의 ref가 있으면 그 블롭
//! └───────┬────────────┘
//!         │ miss
//! ┌───────▼────────────┐
//! │ 2. 공유 윈도우 키   │ ← klines/{SYMBOL}/{tf}/{from}-{to}.json
//! └───────┬────────────┘
//!         │ miss
//! ┌───────▼────────────┐
//! │ 3. 업스트림 조회     │ ← 페이지 이어 붙이기 + 정규화
//! │    잡 키/공유 키 저장 │ ← 저장 실패는 경고 후 무시
//! └────────────────────┘
//! ```

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument, warn};
use trader_core::{BlobStore, Candle, CandleProvider, KlineCacheReference, Timeframe};

use crate::{
    error::{DataError, Result},
    keys::{job_key, window_key},
    normalize::{extract_open_time, normalize_candles, normalize_rows},
};

/// 페이지 최대 수 기본값.
pub const DEFAULT_MAX_PAGES: usize = 50;

/// 해석기 설정.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// 업스트림 페이지 최대 수
    pub max_pages: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

/// 해석 요청.
#[derive(Debug, Clone, Copy)]
pub struct WindowRequest<'a> {
    pub job_id: &'a str,
    pub symbol: &'a str,
    pub timeframe: Timeframe,
    pub from_ms: i64,
    pub to_ms: i64,
}

/// 캔들을 어디서 가져왔는지.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandleSource {
    /// 레코드에 저장된 참조
    KnownRef,
    /// 잡 간 공유 윈도우 키
    SharedWindow,
    /// 업스트림 제공자
    Upstream,
}

/// 해석된 캔들 윈도우.
#[derive(Debug, Clone)]
pub struct ResolvedWindow {
    pub candles: Vec<Candle>,
    /// 업스트림 조회 후 저장에 실패하면 `None`
    pub reference: Option<KlineCacheReference>,
    pub source: CandleSource,
}

/// 캔들 윈도우 해석기.
pub struct KlineResolver {
    blobs: Arc<dyn BlobStore>,
    provider: Arc<dyn CandleProvider>,
    config: ResolverConfig,
}

impl KlineResolver {
    pub fn new(blobs: Arc<dyn BlobStore>, provider: Arc<dyn CandleProvider>) -> Self {
        Self {
            blobs,
            provider,
            config: ResolverConfig::default(),
        }
    }

    /// 설정 지정.
    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// 윈도우 해석.
    ///
    /// # Errors
    ///
    /// - `DataError::Upstream`: 제공자 호출 실패
    /// - `DataError::EmptyWindow`: 정규화 후 캔들이 없음
    #[instrument(skip(self, known_refs), fields(symbol = %req.symbol, timeframe = %req.timeframe))]
    pub async fn resolve(
        &self,
        req: &WindowRequest<'_>,
        known_refs: &[KlineCacheReference],
    ) -> Result<ResolvedWindow> {
        // 1. 알려진 참조
        if let Some(known) = known_refs
            .iter()
            .find(|r| r.matches_window(req.symbol, req.timeframe, req.from_ms, req.to_ms))
        {
            if let Some(candles) = self.load_blob(&known.key).await {
                debug!(key = %known.key, count = candles.len(), "알려진 참조 캐시 히트");
                let mut reference = known.clone();
                reference.candle_count = candles.len();
                return Ok(ResolvedWindow {
                    candles,
                    reference: Some(reference),
                    source: CandleSource::KnownRef,
                });
            }
        }

        // 2. 공유 윈도우 키
        let shared_key = window_key(req.symbol, req.timeframe, req.from_ms, req.to_ms);
        if let Some(candles) = self.load_blob(&shared_key).await {
            debug!(key = %shared_key, count = candles.len(), "공유 윈도우 캐시 히트");
            let reference = self.reference_for(req, &shared_key, candles.len());
            return Ok(ResolvedWindow {
                candles,
                reference: Some(reference),
                source: CandleSource::SharedWindow,
            });
        }

        // 3. 업스트림
        let rows = self.fetch_paginated(req).await?;
        let normalized = normalize_rows(&rows, req.from_ms, req.to_ms);
        if normalized.dropped > 0 {
            debug!(dropped = normalized.dropped, "정규화 중 행 제외");
        }
        if normalized.candles.is_empty() {
            return Err(DataError::EmptyWindow {
                symbol: req.symbol.to_string(),
                timeframe: req.timeframe,
            });
        }

        let candles = normalized.candles;
        let reference = self.persist(req, &shared_key, &candles).await;
        Ok(ResolvedWindow {
            candles,
            reference,
            source: CandleSource::Upstream,
        })
    }

    /// 블롭 로드 + 디코딩. 실패나 빈 시리즈는 모두 miss로 취급.
    async fn load_blob(&self, key: &str) -> Option<Vec<Candle>> {
        let bytes = match self.blobs.get(key).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %key, error = %e, "캐시 블롭 읽기 실패");
                return None;
            }
        };

        match serde_json::from_slice::<Vec<Candle>>(&bytes) {
            Ok(candles) => {
                let candles = normalize_candles(candles);
                (!candles.is_empty()).then_some(candles)
            }
            Err(e) => {
                warn!(key = %key, error = %DataError::Decode(e.to_string()), "캐시 블롭 디코딩 실패");
                None
            }
        }
    }

    /// 페이지 단위 업스트림 조회.
    ///
    /// 빈 페이지, 커서가 전진하지 않는 페이지, 커서가 `to_ms`를 지난 경우,
    /// 또는 `max_pages`에 도달하면 중단합니다.
    async fn fetch_paginated(&self, req: &WindowRequest<'_>) -> Result<Vec<Value>> {
        let step = req.timeframe.duration_ms();
        let mut cursor = req.from_ms;
        let mut rows: Vec<Value> = Vec::new();

        for page in 0..self.config.max_pages.max(1) {
            let batch = self
                .provider
                .fetch(req.symbol, req.timeframe, cursor, req.to_ms)
                .await
                .map_err(|e| DataError::upstream(req.symbol, req.timeframe, e))?;

            if batch.is_empty() {
                break;
            }

            let last_open = batch.iter().filter_map(extract_open_time).max();
            debug!(
                provider = self.provider.provider_name(),
                page,
                rows = batch.len(),
                "업스트림 페이지 수신"
            );
            rows.extend(batch);

            match last_open {
                Some(t) if t >= cursor => {
                    cursor = t.saturating_add(step);
                    if cursor > req.to_ms {
                        break;
                    }
                }
                _ => break,
            }
        }

        Ok(rows)
    }

    /// 잡 키와 공유 키에 저장. 잡 키 저장에 성공하면 그 참조를 반환.
    async fn persist(
        &self,
        req: &WindowRequest<'_>,
        shared_key: &str,
        candles: &[Candle],
    ) -> Option<KlineCacheReference> {
        let bytes = match serde_json::to_vec(candles) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "캔들 직렬화 실패, 캐시 저장 생략");
                return None;
            }
        };

        let scoped_key = job_key(req.job_id, req.symbol, req.timeframe, req.from_ms, req.to_ms);
        let scoped = match self.blobs.put(&scoped_key, bytes.clone()).await {
            Ok(()) => Some(self.reference_for(req, &scoped_key, candles.len())),
            Err(e) => {
                warn!(key = %scoped_key, error = %DataError::from(e), "잡 캐시 저장 실패");
                None
            }
        };

        if let Err(e) = self.blobs.put(shared_key, bytes).await {
            warn!(key = %shared_key, error = %DataError::from(e), "공유 윈도우 캐시 저장 실패");
        }

        scoped
    }

    fn reference_for(&self, req: &WindowRequest<'_>, key: &str, count: usize) -> KlineCacheReference {
        KlineCacheReference {
            key: key.to_string(),
            symbol: req.symbol.trim().to_uppercase(),
            timeframe: req.timeframe,
            from_ms: req.from_ms,
            to_ms: req.to_ms,
            candle_count: count,
            url: self.blobs.public_url(key),
        }
    }
}
