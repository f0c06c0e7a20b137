//! 가치 영역(Value Area) 평균회귀 엔진.
//!
//! 롱 전용. 레인지 하단(VAL) 이하에서 매수하고 POC로의 회귀를 노립니다.
//!
//! # 레벨 결정
//!
//! - 캔들에 AI 오버레이가 있으면 그 값을 사용 (`rangeValid = false`면 진입 금지)
//! - 오버레이가 없으면 실행 봉 마감 시각까지 마감된 주 레인지 캔들의
//!   볼륨 프로파일 (부족하면 보조 레인지 캔들)
//!
//! # 청산
//!
//! | 조건                                | 사유         |
//! |-------------------------------------|--------------|
//! | 저가 ≤ `VAL − 0.5 × (VAH − VAL)`     | `StopLoss`   |
//! | 고가 ≥ POC                          | `TakeProfit` |
//! | 마지막 캔들                          | `EndOfData`  |
//!
//! 같은 봉에서 두 조건이 모두 충족되면 손절을 우선합니다.

use serde::{Deserialize, Serialize};
use tracing::debug;
use trader_core::{
    closed_by,
    indicators::{deterministic_levels, value_area},
    BacktestTrade, Candle, ExitReason, RangeLevels, SignalSnapshot, SnapshotInput, StrategyEngine,
    StrategyError, StrategyInput, StrategyOutput, Timeframe,
};

use crate::metrics::{summarize, EquityTracker};

// ================================================================================================
// 설정
// ================================================================================================

/// 엔진 설정.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeReversionConfig {
    /// 최소 실행 캔들 수
    #[serde(default = "default_min_execution_candles")]
    pub min_execution_candles: usize,

    /// 진입 시 투입할 자산 비율 (0~1)
    #[serde(default = "default_risk_fraction")]
    pub risk_fraction: f64,

    /// 체결 수수료율 (진입/청산 각각, 예: 0.0004 = 0.04%)
    #[serde(default = "default_fee_rate")]
    pub fee_rate: f64,

    /// 오버레이가 없을 때 프로파일에 사용할 레인지 캔들 수
    #[serde(default = "default_profile_lookback")]
    pub profile_lookback: usize,

    /// 프로파일 계산에 필요한 최소 레인지 캔들 수
    #[serde(default = "default_min_profile_candles")]
    pub min_profile_candles: usize,

    /// 손절 폭 배수 (가치 영역 폭 기준)
    #[serde(default = "default_stop_width_mult")]
    pub stop_width_mult: f64,
}

fn default_min_execution_candles() -> usize {
    80
}

fn default_risk_fraction() -> f64 {
    0.5
}

fn default_fee_rate() -> f64 {
    0.0004
}

fn default_profile_lookback() -> usize {
    96
}

fn default_min_profile_candles() -> usize {
    20
}

fn default_stop_width_mult() -> f64 {
    0.5
}

impl Default for RangeReversionConfig {
    fn default() -> Self {
        Self {
            min_execution_candles: default_min_execution_candles(),
            risk_fraction: default_risk_fraction(),
            fee_rate: default_fee_rate(),
            profile_lookback: default_profile_lookback(),
            min_profile_candles: default_min_profile_candles(),
            stop_width_mult: default_stop_width_mult(),
        }
    }
}

// ================================================================================================
// 엔진
// ================================================================================================

/// 특정 봉에서 엔진이 사용하는 레벨.
#[derive(Debug, Clone, Copy, PartialEq)]
struct BarLevels {
    levels: RangeLevels,
    range_valid: bool,
}

/// 보유 포지션.
#[derive(Debug, Clone, Copy)]
struct OpenPosition {
    entry_index: usize,
    entry_time: i64,
    entry_price: f64,
    quantity: f64,
    take_profit: f64,
    stop: f64,
}

/// 가치 영역 평균회귀 엔진.
#[derive(Debug, Clone, Default)]
pub struct RangeReversionEngine {
    config: RangeReversionConfig,
}

impl RangeReversionEngine {
    pub fn new(config: RangeReversionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RangeReversionConfig {
        &self.config
    }

    /// `candle` 시점의 레벨.
    ///
    /// 레인지 캔들은 실행 봉 마감 시각까지 마감된 것만 사용합니다.
    fn levels_at(
        &self,
        candle: &Candle,
        execution_timeframe: Timeframe,
        ranges: [(&[Candle], Timeframe); 2],
    ) -> Option<BarLevels> {
        if let Some(overlay) = candle.range {
            return Some(BarLevels {
                levels: overlay.levels(),
                range_valid: overlay.range_valid,
            });
        }

        let decided_at = candle.open_time + execution_timeframe.duration_ms();
        ranges.into_iter().find_map(|(series, timeframe)| {
            let history = self.history_until(series, timeframe, decided_at);
            if history.len() < self.config.min_profile_candles {
                return None;
            }
            value_area(history).map(|levels| BarLevels {
                levels,
                range_valid: true,
            })
        })
    }

    /// `at_time`까지 마감된 마지막 `profile_lookback`개 캔들.
    fn history_until<'a>(
        &self,
        series: &'a [Candle],
        timeframe: Timeframe,
        at_time: i64,
    ) -> &'a [Candle] {
        let closed = closed_by(series, timeframe, at_time);
        let start = closed.len().saturating_sub(self.config.profile_lookback.max(1));
        &closed[start..]
    }

    fn close_trade(
        &self,
        position: &OpenPosition,
        exit_index: usize,
        exit: &Candle,
        exit_price: f64,
        reason: ExitReason,
    ) -> BacktestTrade {
        let gross = (exit_price - position.entry_price) * position.quantity;
        let fees = self.config.fee_rate * (position.entry_price + exit_price) * position.quantity;
        BacktestTrade {
            entry_time: position.entry_time,
            exit_time: exit.open_time,
            entry_index: position.entry_index,
            exit_index,
            entry_price: position.entry_price,
            exit_price,
            quantity: position.quantity,
            pnl: gross - fees,
            exit_reason: reason,
        }
    }

    fn validate(&self, input: &StrategyInput<'_>) -> Result<(), StrategyError> {
        let actual = input.execution_candles.len();
        let required = self.config.min_execution_candles.max(1);
        if actual < required {
            return Err(StrategyError::InsufficientCandles { required, actual });
        }
        if !(input.initial_equity.is_finite() && input.initial_equity > 0.0) {
            return Err(StrategyError::InvalidInput(format!(
                "초기 자본은 양수여야 합니다: {}",
                input.initial_equity
            )));
        }
        if !(self.config.risk_fraction > 0.0 && self.config.risk_fraction <= 1.0) {
            return Err(StrategyError::InvalidInput(format!(
                "risk_fraction 범위 초과: {}",
                self.config.risk_fraction
            )));
        }
        Ok(())
    }
}

impl StrategyEngine for RangeReversionEngine {
    fn name(&self) -> &str {
        "range_reversion"
    }

    fn run_backtest(&self, input: &StrategyInput<'_>) -> Result<StrategyOutput, StrategyError> {
        self.validate(input)?;

        let candles = input.execution_candles;
        let last_index = candles.len() - 1;
        let mut cash = input.initial_equity;
        let mut tracker = EquityTracker::new(cash);
        let mut trades: Vec<BacktestTrade> = Vec::new();
        let mut position: Option<OpenPosition> = None;

        for (i, candle) in candles.iter().enumerate() {
            if !candle.is_well_formed() {
                continue;
            }

            // 청산 체크 (진입 봉 다음부터)
            if let Some(open) = position {
                let exit = if candle.low <= open.stop {
                    Some((open.stop.min(candle.open), ExitReason::StopLoss))
                } else if candle.high >= open.take_profit {
                    Some((open.take_profit.max(candle.open), ExitReason::TakeProfit))
                } else if i == last_index {
                    Some((candle.close, ExitReason::EndOfData))
                } else {
                    None
                };

                if let Some((price, reason)) = exit {
                    let trade = self.close_trade(&open, i, candle, price, reason);
                    cash += trade.pnl;
                    trades.push(trade);
                    position = None;
                }
            }

            // 진입 체크
            if position.is_none() && i < last_index {
                let bar = self.levels_at(
                    candle,
                    input.execution_timeframe,
                    [
                        (input.primary_range_candles, input.primary_range_timeframe),
                        (input.secondary_range_candles, input.secondary_range_timeframe),
                    ],
                );
                if let Some(BarLevels { levels, range_valid: true }) = bar {
                    let width = levels.width();
                    let quantity = cash * self.config.risk_fraction / candle.close;
                    let triggered = width > 0.0 && candle.close <= levels.val && levels.poc > candle.close;
                    if triggered && quantity.is_finite() && quantity > 0.0 {
                        debug!(
                            index = i,
                            close = candle.close,
                            val = levels.val,
                            poc = levels.poc,
                            "레인지 하단 진입"
                        );
                        position = Some(OpenPosition {
                            entry_index: i,
                            entry_time: candle.open_time,
                            entry_price: candle.close,
                            quantity,
                            take_profit: levels.poc,
                            stop: levels.val - self.config.stop_width_mult * width,
                        });
                    }
                }
            }

            let unrealized = position
                .map(|p| (candle.close - p.entry_price) * p.quantity)
                .unwrap_or(0.0);
            tracker.mark(cash + unrealized);
        }

        // 마지막 봉이 손상되어 건너뛴 경우에도 포지션은 닫음
        if let Some(open) = position {
            let last_valid = candles
                .iter()
                .enumerate()
                .rev()
                .find(|(_, c)| c.is_well_formed());
            if let Some((idx, candle)) = last_valid {
                trades.push(self.close_trade(&open, idx, candle, candle.close, ExitReason::EndOfData));
            }
        }

        let metrics = summarize(&trades, input.initial_equity, tracker.max_drawdown_pct());
        if !metrics.is_finite() {
            return Err(StrategyError::Computation("지표에 유한하지 않은 값이 포함됨".to_string()));
        }

        Ok(StrategyOutput { trades, metrics })
    }

    fn build_signal_snapshot(
        &self,
        input: &SnapshotInput<'_>,
    ) -> Result<SignalSnapshot, StrategyError> {
        let candle = input
            .execution_candles
            .last()
            .ok_or_else(|| StrategyError::InvalidInput("스냅샷 캔들이 없습니다".to_string()))?;

        let bar = self
            .levels_at(
                candle,
                input.execution_timeframe,
                [
                    (input.primary_range_candles, input.primary_range_timeframe),
                    (input.secondary_range_candles, input.secondary_range_timeframe),
                ],
            )
            .or_else(|| {
                deterministic_levels(input.execution_candles).map(|levels| BarLevels {
                    levels,
                    range_valid: false,
                })
            })
            .ok_or_else(|| StrategyError::Computation("레인지 레벨을 계산할 수 없습니다".to_string()))?;

        Ok(SignalSnapshot {
            at_time: candle.open_time,
            range_valid: bar.range_valid,
            val: bar.levels.val,
            poc: bar.levels.poc,
            vah: bar.levels.vah,
            close: candle.close,
        })
    }
}
