//! 잡 단위 캔들 로더 (타임프레임별 in-flight 중복 제거).
//!
//! 실행 타임프레임과 레인지 타임프레임이 같은 경우(예: 둘 다 `15m`)에도
//! 해석은 한 번만 일어나고, 모든 소비자가 같은 결과를 공유합니다.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use futures::{
    future::{BoxFuture, Shared},
    FutureExt,
};
use trader_core::{KlineCacheReference, Timeframe};

use super::resolver::{KlineResolver, ResolvedWindow, WindowRequest};
use crate::error::Result;

type SharedResolve = Shared<BoxFuture<'static, Result<Arc<ResolvedWindow>>>>;

/// 잡 하나의 수명 동안만 존재하는 캔들 로더.
pub struct JobKlineLoader {
    resolver: Arc<KlineResolver>,
    job_id: String,
    symbol: String,
    from_ms: i64,
    to_ms: i64,
    known_refs: Arc<Vec<KlineCacheReference>>,
    inflight: Mutex<HashMap<Timeframe, SharedResolve>>,
}

impl JobKlineLoader {
    pub fn new(
        resolver: Arc<KlineResolver>,
        job_id: impl Into<String>,
        symbol: impl Into<String>,
        from_ms: i64,
        to_ms: i64,
        known_refs: Vec<KlineCacheReference>,
    ) -> Self {
        Self {
            resolver,
            job_id: job_id.into(),
            symbol: symbol.into(),
            from_ms,
            to_ms,
            known_refs: Arc::new(known_refs),
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// 타임프레임 윈도우 로드.
    ///
    /// 같은 타임프레임에 대한 두 번째 이후 호출은 첫 호출의 future를 공유합니다.
    pub async fn load(&self, timeframe: Timeframe) -> Result<Arc<ResolvedWindow>> {
        let fut = {
            let mut inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
            inflight
                .entry(timeframe)
                .or_insert_with(|| self.spawn_resolve(timeframe))
                .clone()
        };
        fut.await
    }

    /// 지금까지 요청된 서로 다른 타임프레임 수.
    pub fn requested_timeframes(&self) -> usize {
        self.inflight.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn spawn_resolve(&self, timeframe: Timeframe) -> SharedResolve {
        let resolver = Arc::clone(&self.resolver);
        let known_refs = Arc::clone(&self.known_refs);
        let job_id = self.job_id.clone();
        let symbol = self.symbol.clone();
        let (from_ms, to_ms) = (self.from_ms, self.to_ms);

        async move {
            let req = WindowRequest {
                job_id: &job_id,
                symbol: &symbol,
                timeframe,
                from_ms,
                to_ms,
            };
            resolver.resolve(&req, &known_refs).await.map(Arc::new)
        }
        .boxed()
        .shared()
    }
}
