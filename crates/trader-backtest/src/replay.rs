//! 저장된 잡 리플레이 (읽기 전용 검사/시각화용).
//!
//! 저장된 지표를 신뢰하지 않고 같은 캔들로 엔진을 다시 돌립니다.
//! 부분 실패는 경고 문자열로만 남기며 리플레이 자체는 실패하지 않습니다.

use serde::Serialize;
use tracing::{debug, warn};
use trader_core::{
    closed_by, BacktestRecord, BacktestTrade, Candle, KlineCacheReference, SignalSnapshot,
    SnapshotInput, StrategyInput, StrategyOutput, Timeframe,
};
use trader_data::dedupe_refs;

use crate::{error::JobError, job::BacktestJobRunner, overlay::overlaid};

/// 진입 시점 신호 스냅샷이 붙은 거래.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayTrade {
    #[serde(flatten)]
    pub trade: BacktestTrade,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<SignalSnapshot>,
}

/// 리플레이 결과.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayedBacktest {
    pub result: Option<StrategyOutput>,
    pub chart_candles: Vec<Candle>,
    pub trades: Vec<ReplayTrade>,
    pub kline_refs: Vec<KlineCacheReference>,
    pub warnings: Vec<String>,
}

impl ReplayedBacktest {
    fn warn(&mut self, job_id: &str, err: JobError) {
        warn!(job_id, error = %err, "리플레이 경고");
        self.warnings.push(err.to_string());
    }
}

pub(crate) async fn replay(
    runner: &BacktestJobRunner,
    record: &BacktestRecord,
    chart_timeframe: Timeframe,
) -> ReplayedBacktest {
    let mut out = ReplayedBacktest::default();
    let loader = runner.loader_for(record);
    let engine = &runner.context().engine;

    let resolved = futures::try_join!(
        loader.load(record.execution_timeframe),
        loader.load(record.primary_range_timeframe),
        loader.load(record.secondary_range_timeframe),
    );

    let mut produced: Vec<KlineCacheReference> = Vec::new();
    let mut execution_candles: Vec<Candle> = Vec::new();

    match resolved {
        Ok((execution, primary, secondary)) => {
            produced.extend(
                [&execution, &primary, &secondary]
                    .into_iter()
                    .filter_map(|w| w.reference.clone()),
            );

            let evaluations = record
                .ai
                .as_ref()
                .map(|ai| ai.evaluations.as_slice())
                .unwrap_or_default();
            execution_candles = overlaid(&execution.candles, evaluations);

            let output = engine.run_backtest(&StrategyInput {
                initial_equity: record.initial_equity,
                execution_timeframe: record.execution_timeframe,
                primary_range_timeframe: record.primary_range_timeframe,
                secondary_range_timeframe: record.secondary_range_timeframe,
                execution_candles: &execution_candles,
                primary_range_candles: &primary.candles,
                secondary_range_candles: &secondary.candles,
            });

            match output {
                Ok(output) => {
                    let exec_step = record.execution_timeframe.duration_ms();
                    for trade in &output.trades {
                        // 진입 봉 마감 시각까지 마감된 레인지 캔들만
                        let decided_at = trade.entry_time + exec_step;
                        let snapshot = engine.build_signal_snapshot(&SnapshotInput {
                            execution_timeframe: record.execution_timeframe,
                            primary_range_timeframe: record.primary_range_timeframe,
                            secondary_range_timeframe: record.secondary_range_timeframe,
                            execution_candles: up_to(&execution_candles, trade.entry_time),
                            primary_range_candles: closed_by(
                                &primary.candles,
                                record.primary_range_timeframe,
                                decided_at,
                            ),
                            secondary_range_candles: closed_by(
                                &secondary.candles,
                                record.secondary_range_timeframe,
                                decided_at,
                            ),
                        });
                        let signal = match snapshot {
                            Ok(signal) => Some(signal),
                            Err(e) => {
                                out.warn(
                                    &record.id,
                                    JobError::Replay(format!(
                                        "거래 {} 신호 재구성 실패: {e}",
                                        trade.entry_time
                                    )),
                                );
                                None
                            }
                        };
                        out.trades.push(ReplayTrade {
                            trade: trade.clone(),
                            signal,
                        });
                    }
                    out.result = Some(output);
                }
                Err(e) => out.warn(&record.id, JobError::Replay(format!("지표 재계산 실패: {e}"))),
            }
        }
        Err(e) => out.warn(&record.id, JobError::Replay(format!("캔들 재해석 실패: {e}"))),
    }

    // 차트 전용 타임프레임 (실행 타임프레임이면 오버레이된 캔들 재사용)
    if chart_timeframe == record.execution_timeframe && !execution_candles.is_empty() {
        out.chart_candles = execution_candles;
    } else {
        match loader.load(chart_timeframe).await {
            Ok(window) => {
                if let Some(reference) = window.reference.clone() {
                    produced.push(reference);
                }
                out.chart_candles = window.candles.clone();
            }
            Err(e) => out.warn(
                &record.id,
                JobError::Replay(format!("차트 캔들({chart_timeframe}) 해석 실패: {e}")),
            ),
        }
    }

    out.kline_refs = dedupe_refs(record.kline_refs.iter().cloned().chain(produced));
    debug!(
        job_id = %record.id,
        trades = out.trades.len(),
        warnings = out.warnings.len(),
        "리플레이 완료"
    );
    out
}

/// `open_time <= at`인 앞부분 (캔들은 오름차순).
fn up_to(candles: &[Candle], at: i64) -> &[Candle] {
    let end = candles.partition_point(|c| c.open_time <= at);
    &candles[..end]
}
