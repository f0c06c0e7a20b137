//! StrategyEngine trait 정의.
//!
//! 전략 시뮬레이션 엔진은 순수 함수로 취급합니다: 캔들을 넣으면
//! 거래 목록과 성과 지표가 나옵니다. 같은 입력에는 항상 같은 출력.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{BacktestMetrics, Candle, Timeframe};

/// 전략 엔진 에러.
#[derive(Debug, Clone, Error)]
pub enum StrategyError {
    /// 실행 캔들 부족
    #[error("insufficient candles: need {required}, got {actual}")]
    InsufficientCandles { required: usize, actual: usize },

    /// 잘못된 입력
    #[error("잘못된 전략 입력: {0}")]
    InvalidInput(String),

    /// 계산 실패
    #[error("전략 계산 실패: {0}")]
    Computation(String),
}

/// 백테스트 입력.
#[derive(Debug, Clone)]
pub struct StrategyInput<'a> {
    pub initial_equity: f64,
    pub execution_timeframe: Timeframe,
    pub primary_range_timeframe: Timeframe,
    pub secondary_range_timeframe: Timeframe,
    /// AI 오버레이가 적용된 실행 타임프레임 캔들
    pub execution_candles: &'a [Candle],
    pub primary_range_candles: &'a [Candle],
    pub secondary_range_candles: &'a [Candle],
}

/// 거래 청산 사유.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    TakeProfit,
    StopLoss,
    EndOfData,
}

/// 완료된 거래 (라운드트립).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestTrade {
    pub entry_time: i64,
    pub exit_time: i64,
    pub entry_index: usize,
    pub exit_index: usize,
    pub entry_price: f64,
    pub exit_price: f64,
    pub quantity: f64,
    pub pnl: f64,
    pub exit_reason: ExitReason,
}

/// 백테스트 결과.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyOutput {
    pub trades: Vec<BacktestTrade>,
    pub metrics: BacktestMetrics,
}

/// 특정 시점의 신호 스냅샷 입력.
#[derive(Debug, Clone)]
pub struct SnapshotInput<'a> {
    pub execution_timeframe: Timeframe,
    pub primary_range_timeframe: Timeframe,
    pub secondary_range_timeframe: Timeframe,
    /// 스냅샷 시점까지의 실행 캔들 (마지막 원소가 스냅샷 시점)
    pub execution_candles: &'a [Candle],
    pub primary_range_candles: &'a [Candle],
    pub secondary_range_candles: &'a [Candle],
}

/// 엔진이 특정 시점에 보았던 레인지 레벨.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalSnapshot {
    pub at_time: i64,
    pub range_valid: bool,
    pub val: f64,
    pub poc: f64,
    pub vah: f64,
    pub close: f64,
}

/// 전략 시뮬레이션 엔진.
pub trait StrategyEngine: Send + Sync {
    /// 엔진 이름 (로깅용).
    fn name(&self) -> &str;

    /// 전체 구간 백테스트.
    fn run_backtest(&self, input: &StrategyInput<'_>) -> Result<StrategyOutput, StrategyError>;

    /// 마지막 실행 캔들 시점의 신호 스냅샷.
    fn build_signal_snapshot(
        &self,
        input: &SnapshotInput<'_>,
    ) -> Result<SignalSnapshot, StrategyError>;
}
