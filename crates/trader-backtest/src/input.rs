//! 백테스트 잡 입력.

use serde::{Deserialize, Serialize};
use trader_core::{AiConfigInput, Timeframe};
use validator::{Validate, ValidationError};

use crate::error::Result;

/// 기본 초기 자본.
pub const DEFAULT_INITIAL_EQUITY: f64 = 10_000.0;

/// 백테스트 잡 입력.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_window"))]
pub struct BacktestJobInput {
    #[validate(custom(function = "non_blank"))]
    pub bot_id: String,

    #[validate(custom(function = "non_blank"))]
    pub strategy_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,

    #[validate(length(min = 1, max = 32), custom(function = "non_blank"))]
    pub symbol: String,

    pub from_ms: i64,
    pub to_ms: i64,

    pub execution_timeframe: Timeframe,
    pub primary_range_timeframe: Timeframe,
    pub secondary_range_timeframe: Timeframe,

    #[serde(default = "default_initial_equity")]
    #[validate(range(exclusive_min = 0.0))]
    pub initial_equity: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai: Option<AiConfigInput>,
}

fn default_initial_equity() -> f64 {
    DEFAULT_INITIAL_EQUITY
}

fn non_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

fn validate_window(input: &BacktestJobInput) -> std::result::Result<(), ValidationError> {
    if input.from_ms >= input.to_ms {
        return Err(ValidationError::new("from_ms_not_before_to_ms"));
    }
    if !input.initial_equity.is_finite() {
        return Err(ValidationError::new("initial_equity_not_finite"));
    }
    Ok(())
}

impl BacktestJobInput {
    /// 검증 후 식별자 필드를 정리합니다 (공백 제거, 심볼 대문자).
    pub fn validated(mut self) -> Result<Self> {
        self.validate()?;
        self.bot_id = self.bot_id.trim().to_string();
        self.strategy_id = self.strategy_id.trim().to_string();
        self.symbol = self.symbol.trim().to_uppercase();
        self.account_id = self
            .account_id
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JobError;
    use serde_json::json;

    fn base() -> serde_json::Value {
        json!({
            "botId": "bot-1",
            "strategyId": "range",
            "symbol": "btcusdt",
            "fromMs": 0,
            "toMs": 1_000,
            "executionTimeframe": "15m",
            "primaryRangeTimeframe": "1h",
            "secondaryRangeTimeframe": "4h"
        })
    }

    #[test]
    fn defaults_and_normalization() {
        let input: BacktestJobInput = serde_json::from_value(base()).unwrap();
        assert_eq!(input.initial_equity, DEFAULT_INITIAL_EQUITY);
        let input = input.validated().unwrap();
        assert_eq!(input.symbol, "BTCUSDT");
        assert_eq!(input.execution_timeframe, Timeframe::M15);
    }

    #[test]
    fn inverted_window_is_rejected() {
        let mut raw = base();
        raw["fromMs"] = json!(5_000);
        let input: BacktestJobInput = serde_json::from_value(raw).unwrap();
        assert!(matches!(input.validated(), Err(JobError::Validation(_))));
    }

    #[test]
    fn blank_ids_and_bad_equity_are_rejected() {
        let mut raw = base();
        raw["botId"] = json!("   ");
        let input: BacktestJobInput = serde_json::from_value(raw).unwrap();
        assert!(input.validated().is_err());

        let mut raw = base();
        raw["initialEquity"] = json!(0.0);
        let input: BacktestJobInput = serde_json::from_value(raw).unwrap();
        assert!(input.validated().is_err());

        let mut raw = base();
        raw["symbol"] = json!("X".repeat(33));
        let input: BacktestJobInput = serde_json::from_value(raw).unwrap();
        assert!(input.validated().is_err());
    }

    #[test]
    fn unknown_timeframe_fails_to_deserialize() {
        let mut raw = base();
        raw["executionTimeframe"] = json!("7m");
        assert!(serde_json::from_value::<BacktestJobInput>(raw).is_err());
    }
}
