//! 백테스트 잡 오케스트레이터.
//!
//! # 상태 전이
//!
//! ```text
//!            ┌──────────── completed (종료, 재제출 시 그대로 반환)
//! running ───┤
//!            └──────────── failed    (종료, 재제출 시 그대로 반환. 재시도는 새 id)
//! ```
//!
//! # 동작 흐름
//!
//! ```text
//! 1. 식별자 확인 / running 레코드 저장
//! 2. 캔들 해석 (타임프레임 3개 동시, 같은 타임프레임은 1회)
//! 3. AI 검증 (활성 시, 평가 시점별 순차 실행, 옵저버 통지)
//! 4. 오버레이 → 전략 엔진
//! 5. completed 저장  /  모든 에러 → failed 저장 (메시지 500자 제한)
//! ```

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};
use trader_ai::{plan, window_bounds, CompletionService, EvaluationOutcome, RangeValidator};
use trader_core::{
    text::truncate_chars, AiConfig, AiSummary, BacktestMetrics, BacktestRecord,
    BacktestStatus, Candle, StrategyInput, Timeframe,
};
use trader_data::{dedupe_refs, JobKlineLoader, KlineResolver};
use uuid::Uuid;

use crate::{
    context::JobContext,
    error::{JobError, Result},
    input::BacktestJobInput,
    observer::{AiProgressObserver, NoopObserver},
    overlay::apply_overlay,
    replay::{self, ReplayedBacktest},
};

/// 실패 메시지 최대 길이.
pub const MAX_ERROR_MESSAGE_CHARS: usize = 500;

/// 잡 식별자 (중복 전달/재시도용).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobIdentity {
    pub id: String,
}

impl JobIdentity {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// 식별자 확인 결과.
enum Prepared {
    /// 이미 종료(completed/failed). 다시 계산하지 않음
    Done(BacktestRecord),
    Run(BacktestRecord),
}

/// 백테스트 잡 실행기.
pub struct BacktestJobRunner {
    ctx: JobContext,
    resolver: Arc<KlineResolver>,
}

impl BacktestJobRunner {
    pub fn new(ctx: JobContext) -> Self {
        let resolver = KlineResolver::new(Arc::clone(&ctx.blobs), Arc::clone(&ctx.provider))
            .with_config(ctx.resolver.clone());
        Self {
            ctx,
            resolver: Arc::new(resolver),
        }
    }

    pub fn context(&self) -> &JobContext {
        &self.ctx
    }

    pub(crate) fn loader_for(&self, record: &BacktestRecord) -> JobKlineLoader {
        JobKlineLoader::new(
            Arc::clone(&self.resolver),
            record.id.clone(),
            record.symbol.clone(),
            record.from_ms,
            record.to_ms,
            record.kline_refs.clone(),
        )
    }

    /// 잡 실행.
    ///
    /// 에러를 반환하지 않습니다. 모든 실패는 `failed` 레코드로 변환됩니다.
    #[instrument(skip_all, fields(symbol = %input.symbol, bot_id = %input.bot_id))]
    pub async fn run(
        &self,
        input: BacktestJobInput,
        identity: Option<JobIdentity>,
        observer: Option<&dyn AiProgressObserver>,
    ) -> BacktestRecord {
        let observer = observer.unwrap_or(&NoopObserver);

        let mut record = match self.prepare(&input, identity).await {
            Ok(Prepared::Done(record)) => {
                info!(
                    job_id = %record.id,
                    status = record.status.as_str(),
                    "이미 종료된 잡, 재계산 생략"
                );
                return record;
            }
            Ok(Prepared::Run(record)) => record,
            Err((record, err)) => return self.finish_failed(record, err).await,
        };

        info!(job_id = %record.id, "백테스트 잡 시작");
        match self.execute(&input, &mut record, observer).await {
            Ok(()) => {
                record.status = BacktestStatus::Completed;
                record.error_message = None;
                record.updated_at_ms = now_ms();
                if let Err(e) = self.ctx.records.put(&record).await {
                    warn!(job_id = %record.id, error = %e, "완료 레코드 저장 실패");
                }
                info!(
                    job_id = %record.id,
                    trades = record.metrics.total_trades,
                    net_pnl = record.metrics.net_pnl,
                    "백테스트 잡 완료"
                );
                record
            }
            Err(err) => self.finish_failed(record, err).await,
        }
    }

    /// 저장된 잡 리플레이.
    pub async fn replay(
        &self,
        record: &BacktestRecord,
        chart_timeframe: Timeframe,
    ) -> ReplayedBacktest {
        replay::replay(self, record, chart_timeframe).await
    }

    // =========================================================================
    // 단계별 처리
    // =========================================================================

    /// 식별자 확인 후 running 레코드 저장.
    async fn prepare(
        &self,
        input: &BacktestJobInput,
        identity: Option<JobIdentity>,
    ) -> std::result::Result<Prepared, (BacktestRecord, JobError)> {
        let requested = identity
            .map(|i| i.id.trim().to_string())
            .filter(|id| !id.is_empty());

        let existing = match &requested {
            Some(id) => match self.ctx.records.get(id).await {
                Ok(found) => found,
                Err(e) => {
                    warn!(job_id = %id, error = %e, "기존 레코드 조회 실패, 새로 시작");
                    None
                }
            },
            None => None,
        };

        let record = match existing {
            Some(record) if record.is_terminal() => {
                return Ok(Prepared::Done(record));
            }
            Some(record) => {
                debug!(job_id = %record.id, status = record.status.as_str(), "기존 레코드 재사용");
                let mut fresh = running_record(record.id.clone(), input);
                fresh.created_at_ms = record.created_at_ms;
                fresh.kline_refs = record.kline_refs;
                fresh
            }
            None => {
                let id = requested.unwrap_or_else(|| Uuid::new_v4().to_string());
                running_record(id, input)
            }
        };

        match self.ctx.records.put(&record).await {
            Ok(()) => Ok(Prepared::Run(record)),
            Err(e) => Err((record, e.into())),
        }
    }

    async fn execute(
        &self,
        input: &BacktestJobInput,
        record: &mut BacktestRecord,
        observer: &dyn AiProgressObserver,
    ) -> Result<()> {
        let input = input.clone().validated()?;
        let ai_config = AiConfig::normalize(&input.ai.clone().unwrap_or_default());
        record.ai_config = ai_config.clone();

        // AI가 켜져 있으면 캔들 조회 전에 서비스부터 확인
        let completion = if ai_config.enabled {
            Some(self.ctx.completion.clone().ok_or_else(|| {
                JobError::AiConfiguration("AI 검증이 활성화되었지만 completion 서비스가 없습니다".to_string())
            })?)
        } else {
            None
        };

        // 2. 캔들 해석
        let loader = self.loader_for(record);
        let (execution, primary, secondary) = futures::try_join!(
            loader.load(input.execution_timeframe),
            loader.load(input.primary_range_timeframe),
            loader.load(input.secondary_range_timeframe),
        )?;
        debug!(
            job_id = %record.id,
            execution = execution.candles.len(),
            primary = primary.candles.len(),
            secondary = secondary.candles.len(),
            "캔들 해석 완료"
        );

        let produced = [&execution, &primary, &secondary]
            .into_iter()
            .filter_map(|w| w.reference.clone());
        let known = std::mem::take(&mut record.kline_refs);
        record.kline_refs = dedupe_refs(known.into_iter().chain(produced));

        // 3. AI 검증
        let mut execution_candles: Vec<Candle> = execution.candles.clone();
        if let Some(service) = completion {
            let summary = self
                .run_ai(record, &execution_candles, &ai_config, service, observer)
                .await;
            // 4. 오버레이
            apply_overlay(&mut execution_candles, &summary.evaluations);
            record.ai = Some(summary);
        } else {
            record.ai = None;
        }

        // 4. 전략 엔진
        let output = self.ctx.engine.run_backtest(&StrategyInput {
            initial_equity: input.initial_equity,
            execution_timeframe: input.execution_timeframe,
            primary_range_timeframe: input.primary_range_timeframe,
            secondary_range_timeframe: input.secondary_range_timeframe,
            execution_candles: &execution_candles,
            primary_range_candles: &primary.candles,
            secondary_range_candles: &secondary.candles,
        })?;

        record.metrics = output.metrics;
        Ok(())
    }

    /// 계획된 시점마다 순차 평가. 개별 실패는 요약에만 기록됩니다.
    async fn run_ai(
        &self,
        record: &mut BacktestRecord,
        candles: &[Candle],
        config: &AiConfig,
        service: Arc<dyn CompletionService>,
        observer: &dyn AiProgressObserver,
    ) -> AiSummary {
        let plan = plan(candles.len(), config);
        let mut summary = AiSummary::planned(config.clone(), plan.effective_cadence_bars, plan.len());
        info!(
            job_id = %record.id,
            planned = plan.len(),
            cadence = plan.effective_cadence_bars,
            "AI 검증 계획"
        );
        self.publish(record, &summary, observer).await;

        let validator = RangeValidator::new(service).with_policy(self.ctx.escalation.clone());
        for &at_index in &plan.indices {
            let window = &candles[window_bounds(at_index, config.lookback_candles)];
            let outcome = validator
                .evaluate(&record.symbol, record.execution_timeframe, window, at_index, config)
                .await;

            if let EvaluationOutcome::Evaluated(evaluation) = outcome {
                if let Some(message) = &evaluation.error_message {
                    warn!(
                        job_id = %record.id,
                        at_index,
                        error = %JobError::AiEvaluation(message.clone()),
                        "평가 시점 실패, 결정론적 레인지 사용"
                    );
                }
                summary.record(evaluation);
            }
            self.publish(record, &summary, observer).await;
        }

        self.publish(record, &summary, observer).await;
        summary
    }

    /// 옵저버 통지 + running 레코드의 AI 요약 갱신 (둘 다 best-effort).
    async fn publish(
        &self,
        record: &mut BacktestRecord,
        summary: &AiSummary,
        observer: &dyn AiProgressObserver,
    ) {
        if let Err(e) = observer.on_progress(summary).await {
            warn!(job_id = %record.id, error = %e, "옵저버 에러 무시");
        }

        record.ai = Some(summary.clone());
        record.updated_at_ms = now_ms();
        if let Err(e) = self.ctx.records.put(record).await {
            warn!(job_id = %record.id, error = %e, "AI 진행 상황 저장 실패");
        }
    }

    async fn finish_failed(&self, mut record: BacktestRecord, err: JobError) -> BacktestRecord {
        warn!(job_id = %record.id, error = %err, fatal = err.is_fatal(), "백테스트 잡 실패");
        mark_failed(&mut record, &err.to_string());
        if let Err(e) = self.ctx.records.put(&record).await {
            warn!(job_id = %record.id, error = %e, "실패 레코드 저장 실패");
        }
        record
    }
}

/// 입력으로부터 running 레코드 생성.
fn running_record(id: String, input: &BacktestJobInput) -> BacktestRecord {
    let now = now_ms();
    BacktestRecord {
        id,
        created_at_ms: now,
        updated_at_ms: now,
        bot_id: input.bot_id.trim().to_string(),
        strategy_id: input.strategy_id.trim().to_string(),
        account_id: input.account_id.clone(),
        symbol: input.symbol.trim().to_uppercase(),
        from_ms: input.from_ms,
        to_ms: input.to_ms,
        execution_timeframe: input.execution_timeframe,
        primary_range_timeframe: input.primary_range_timeframe,
        secondary_range_timeframe: input.secondary_range_timeframe,
        initial_equity: input.initial_equity,
        status: BacktestStatus::Running,
        metrics: BacktestMetrics::default(),
        kline_refs: Vec::new(),
        error_message: None,
        ai_config: AiConfig::normalize(&input.ai.clone().unwrap_or_default()),
        ai: None,
    }
}

/// 레코드를 failed로 전환 (지표는 running 기본값으로).
pub(crate) fn mark_failed(record: &mut BacktestRecord, message: &str) {
    record.status = BacktestStatus::Failed;
    record.metrics = BacktestMetrics::default();
    record.error_message = Some(truncate_chars(message, MAX_ERROR_MESSAGE_CHARS));
    record.updated_at_ms = now_ms();
}

pub(crate) fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
