//! 백테스트 잡 레코드.

use serde::{Deserialize, Serialize};

use super::{
    ai::{AiConfig, AiSummary},
    timeframe::Timeframe,
};

/// 잡 상태. `Completed`/`Failed`는 종료 상태입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BacktestStatus {
    Running,
    Completed,
    Failed,
}

impl BacktestStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// 성과 지표. 기본값(모두 0)이 running 단계의 초기값입니다.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestMetrics {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate_pct: f64,
    pub net_pnl: f64,
    pub max_drawdown_pct: f64,
    pub ending_equity: f64,
}

impl BacktestMetrics {
    pub fn is_finite(&self) -> bool {
        self.win_rate_pct.is_finite()
            && self.net_pnl.is_finite()
            && self.max_drawdown_pct.is_finite()
            && self.ending_equity.is_finite()
    }
}

/// 블롭 저장소에 저장된 캔들 윈도우를 가리키는 핸들.
///
/// 캔들 데이터를 소유하지 않으며, 정규화된 `key`가 같으면 같은 참조로 취급합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KlineCacheReference {
    pub key: String,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub from_ms: i64,
    pub to_ms: i64,
    pub candle_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl KlineCacheReference {
    /// 같은 (심볼, 타임프레임, 구간)을 가리키는지 확인.
    pub fn matches_window(&self, symbol: &str, timeframe: Timeframe, from_ms: i64, to_ms: i64) -> bool {
        self.symbol.eq_ignore_ascii_case(symbol)
            && self.timeframe == timeframe
            && self.from_ms == from_ms
            && self.to_ms == to_ms
    }
}

/// 백테스트 잡 레코드.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestRecord {
    pub id: String,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
    pub bot_id: String,
    pub strategy_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    pub symbol: String,
    pub from_ms: i64,
    pub to_ms: i64,
    pub execution_timeframe: Timeframe,
    pub primary_range_timeframe: Timeframe,
    pub secondary_range_timeframe: Timeframe,
    pub initial_equity: f64,
    pub status: BacktestStatus,
    #[serde(default)]
    pub metrics: BacktestMetrics,
    #[serde(default)]
    pub kline_refs: Vec<KlineCacheReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// 잡 시작 시 정규화된 AI 설정
    #[serde(default)]
    pub ai_config: AiConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai: Option<AiSummary>,
}

impl BacktestRecord {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
