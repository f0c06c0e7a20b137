//! 통합 테스트 공용 스텁.

#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use serde_json::{json, Value};
use trader_ai::{AiError, CompletionRequest, CompletionService};
use trader_backtest::{BacktestJobInput, BacktestJobRunner, JobContext};
use trader_core::{
    AiConfigInput, Candle, CandleProvider, ProviderError, SignalSnapshot, SnapshotInput,
    StrategyEngine, StrategyError, StrategyInput, StrategyOutput, Timeframe,
};
use trader_data::{InMemoryBlobStore, InMemoryRecordStore};
use trader_strategy::RangeReversionEngine;

pub const PRIMARY: &str = "test/primary";
pub const FALLBACK: &str = "test/fallback";

/// 타임프레임 간격마다 진동하는 가격을 만들어내는 제공자.
#[derive(Default)]
pub struct SyntheticProvider {
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl SyntheticProvider {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl CandleProvider for SyntheticProvider {
    async fn fetch(
        &self,
        _symbol: &str,
        timeframe: Timeframe,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<Value>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(ProviderError::Api("HTTP 503: unavailable".to_string()));
        }

        let step = timeframe.duration_ms();
        let first = (from_ms + step - 1).div_euclid(step);
        let last = to_ms.div_euclid(step);
        Ok((first..=last).map(|k| synthetic_row(k, step)).collect())
    }

    fn provider_name(&self) -> &str {
        "synthetic"
    }
}

fn synthetic_row(k: i64, step: i64) -> Value {
    let x = k as f64 * 0.35;
    let open = 100.0 + 3.0 * (x - 0.35).sin();
    let close = 100.0 + 3.0 * x.sin();
    let high = open.max(close) + 0.4;
    let low = open.min(close) - 0.4;
    let volume = 10.0 + (k % 7) as f64;
    json!([
        k * step,
        open.to_string(),
        high.to_string(),
        low.to_string(),
        close.to_string(),
        volume.to_string()
    ])
}

/// 모델별 고정 응답 서비스. 호출 (모델, 토큰 예산)을 기록합니다.
#[derive(Default)]
pub struct StaticCompletion {
    responses: Mutex<HashMap<String, Result<String, AiError>>>,
    calls: Mutex<Vec<(String, u32)>>,
}

impl StaticCompletion {
    pub fn answer(&self, model: &str, response: Result<String, AiError>) {
        self.responses
            .lock()
            .unwrap()
            .insert(model.to_string(), response);
    }

    pub fn calls(&self) -> Vec<(String, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for StaticCompletion {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, AiError> {
        self.calls
            .lock()
            .unwrap()
            .push((request.model.clone(), request.max_output_tokens));
        self.responses
            .lock()
            .unwrap()
            .get(&request.model)
            .cloned()
            .unwrap_or_else(|| Err(AiError::Transport("no scripted answer".to_string())))
    }
}

pub fn verdict(is_ranging: bool, confidence: f64) -> Result<String, AiError> {
    Ok(format!(
        r#"{{"isRanging": {is_ranging}, "confidence": {confidence}, "range": {{"val": 98, "poc": 100, "vah": 102}}, "reasons": ["balanced volume"]}}"#
    ))
}

/// 엔진이 받은 실행 캔들을 기록하고 기본 엔진에 위임.
#[derive(Default)]
pub struct CapturingEngine {
    inner: RangeReversionEngine,
    seen: Mutex<Vec<Candle>>,
}

impl CapturingEngine {
    pub fn execution_candles(&self) -> Vec<Candle> {
        self.seen.lock().unwrap().clone()
    }
}

impl StrategyEngine for CapturingEngine {
    fn name(&self) -> &str {
        "capturing"
    }

    fn run_backtest(&self, input: &StrategyInput<'_>) -> Result<StrategyOutput, StrategyError> {
        *self.seen.lock().unwrap() = input.execution_candles.to_vec();
        self.inner.run_backtest(input)
    }

    fn build_signal_snapshot(
        &self,
        input: &SnapshotInput<'_>,
    ) -> Result<SignalSnapshot, StrategyError> {
        self.inner.build_signal_snapshot(input)
    }
}

/// 테스트 환경 묶음.
pub struct Harness {
    pub blobs: Arc<InMemoryBlobStore>,
    pub records: Arc<InMemoryRecordStore>,
    pub provider: Arc<SyntheticProvider>,
    pub llm: Arc<StaticCompletion>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            blobs: Arc::new(InMemoryBlobStore::new()),
            records: Arc::new(InMemoryRecordStore::new()),
            provider: Arc::new(SyntheticProvider::default()),
            llm: Arc::new(StaticCompletion::default()),
        }
    }

    fn context(&self, engine: Arc<dyn StrategyEngine>) -> JobContext {
        JobContext::new(
            self.blobs.clone(),
            self.records.clone(),
            self.provider.clone(),
            engine,
        )
    }

    pub fn runner(&self) -> BacktestJobRunner {
        self.runner_with_engine(Arc::new(RangeReversionEngine::default()))
    }

    pub fn runner_with_engine(&self, engine: Arc<dyn StrategyEngine>) -> BacktestJobRunner {
        BacktestJobRunner::new(self.context(engine).with_completion(self.llm.clone()))
    }

    pub fn runner_without_completion(&self) -> BacktestJobRunner {
        BacktestJobRunner::new(self.context(Arc::new(RangeReversionEngine::default())))
    }
}

/// `bars`개의 15분봉 실행 구간 (레인지 타임프레임은 1h / 4h).
pub fn input(bars: i64) -> BacktestJobInput {
    let step = Timeframe::M15.duration_ms();
    BacktestJobInput {
        bot_id: "bot-1".to_string(),
        strategy_id: "range".to_string(),
        account_id: None,
        symbol: "btcusdt".to_string(),
        from_ms: 0,
        to_ms: (bars - 1) * step,
        execution_timeframe: Timeframe::M15,
        primary_range_timeframe: Timeframe::H1,
        secondary_range_timeframe: Timeframe::H4,
        initial_equity: 10_000.0,
        ai: None,
    }
}

pub fn with_ai(mut input: BacktestJobInput, cadence: i64, max_evaluations: i64) -> BacktestJobInput {
    input.ai = Some(AiConfigInput {
        enabled: Some(true),
        cadence_bars: Some(cadence),
        max_evaluations: Some(max_evaluations),
        model_primary: Some(PRIMARY.to_string()),
        model_fallback: Some(FALLBACK.to_string()),
        ..Default::default()
    });
    input
}
