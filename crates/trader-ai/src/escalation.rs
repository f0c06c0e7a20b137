//! 2-모델 신뢰도 기반 에스컬레이션.
//!
//! ```text
//! primary (700 토큰)
//!   └─ 실패 → primary 재시도 (min(2×, 2000) 토큰)
//! primary 성공 && confidence ≥ threshold → primary 채택
//! 그 외 → fallback 1회 (확장 예산)
//!   fallback 성공 && (primary 실패 || fallback.conf ≥ primary.conf) → fallback
//!   primary 성공 → primary
//!   둘 다 실패 → 실패 평가 (결정론적 레인지)
//! ```
//!
//! 한 평가 시점의 실패는 그 시점만의 실패이며 잡 전체를 실패시키지 않습니다.

use std::{sync::Arc, time::Duration};

use tracing::{debug, warn};
use trader_core::{
    ai::defaults::LOOKBACK_FLOOR, indicators::deterministic_levels, text::truncate_chars, AiConfig,
    AiEvaluation, Candle, RangeLevels, Timeframe, AI_VALIDATION_FAILED,
};

use crate::{
    client::{CompletionRequest, CompletionService},
    error::AiError,
    parse::{parse_model_response, ParsedVerdict},
    prompt::{build_payload, SYSTEM_PROMPT},
};

/// primary 호출 토큰 예산.
pub const PRIMARY_MAX_TOKENS: u32 = 700;
/// 확장 예산 상한.
pub const ESCALATED_MAX_TOKENS_CAP: u32 = 2000;
/// 호출당 타임아웃.
pub const CALL_TIMEOUT: Duration = Duration::from_secs(25);
/// 샘플링 온도.
pub const TEMPERATURE: f64 = 0.0;
/// 실패 평가의 에러 메시지 최대 길이.
pub const MAX_ERROR_CHARS: usize = 500;

/// 확장 예산 `min(2 × primary, 2000)`.
pub fn escalated_budget(primary: u32) -> u32 {
    primary.saturating_mul(2).min(ESCALATED_MAX_TOKENS_CAP)
}

/// 호출 정책.
#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    pub primary_max_tokens: u32,
    pub call_timeout: Duration,
    pub temperature: f64,
}

impl Default for EscalationPolicy {
    fn default() -> Self {
        Self {
            primary_max_tokens: PRIMARY_MAX_TOKENS,
            call_timeout: CALL_TIMEOUT,
            temperature: TEMPERATURE,
        }
    }
}

/// 평가 결과.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationOutcome {
    /// 윈도우가 너무 짧아 평가하지 않음 (실행 횟수에 포함되지 않음)
    Skipped,
    Evaluated(AiEvaluation),
}

/// 레인지 검증기.
pub struct RangeValidator {
    service: Arc<dyn CompletionService>,
    policy: EscalationPolicy,
}

impl RangeValidator {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self {
            service,
            policy: EscalationPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: EscalationPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 윈도우 마지막 캔들 시점의 레인지 검증.
    pub async fn evaluate(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        window: &[Candle],
        at_index: usize,
        config: &AiConfig,
    ) -> EvaluationOutcome {
        let Some(last) = window.last() else {
            return EvaluationOutcome::Skipped;
        };
        if window.len() < LOOKBACK_FLOOR {
            return EvaluationOutcome::Skipped;
        }
        let at_time = last.open_time;

        let fallback_range = deterministic_levels(window)
            .unwrap_or_else(|| RangeLevels::sorted(last.close, last.close, last.close));
        let payload = build_payload(symbol, timeframe, window, fallback_range).to_string();

        let escalated = escalated_budget(self.policy.primary_max_tokens);

        // 1. primary (실패 시 확장 예산으로 1회 재시도)
        let primary = match self
            .attempt(&config.model_primary, &payload, self.policy.primary_max_tokens, fallback_range)
            .await
        {
            Ok(v) => Ok(v),
            Err(e) => {
                debug!(at_index, error = %e, "primary 실패, 확장 예산으로 재시도");
                self.attempt(&config.model_primary, &payload, escalated, fallback_range)
                    .await
            }
        };

        if let Ok(verdict) = &primary {
            if verdict.confidence >= config.confidence_threshold {
                return EvaluationOutcome::Evaluated(success(
                    at_index,
                    at_time,
                    &config.model_primary,
                    false,
                    verdict.clone(),
                    config,
                ));
            }
        }

        // 2. fallback 1회
        let fallback = self
            .attempt(&config.model_fallback, &payload, escalated, fallback_range)
            .await;

        let evaluation = match (primary, fallback) {
            (Err(_), Ok(fb)) => success(at_index, at_time, &config.model_fallback, true, fb, config),
            (Ok(p), Ok(fb)) if fb.confidence >= p.confidence => {
                success(at_index, at_time, &config.model_fallback, true, fb, config)
            }
            (Ok(p), _) => success(at_index, at_time, &config.model_primary, false, p, config),
            (Err(primary_err), Err(fallback_err)) => {
                warn!(
                    symbol = %symbol,
                    at_index,
                    primary_error = %primary_err,
                    fallback_error = %fallback_err,
                    "AI 검증 실패 (두 모델 모두 실패)"
                );
                failure(at_index, at_time, config, true, fallback_range, &fallback_err)
            }
        };

        EvaluationOutcome::Evaluated(evaluation)
    }

    /// 단일 호출 + 파싱. 타임아웃/전송/파싱 실패 모두 `Err`.
    async fn attempt(
        &self,
        model: &str,
        payload: &str,
        max_tokens: u32,
        fallback_range: RangeLevels,
    ) -> Result<ParsedVerdict, AiError> {
        let request = CompletionRequest {
            model: model.to_string(),
            system_prompt: SYSTEM_PROMPT.to_string(),
            user_payload: payload.to_string(),
            max_output_tokens: max_tokens,
            temperature: self.policy.temperature,
            timeout: self.policy.call_timeout,
        };

        debug!(
            service = self.service.service_name(),
            model,
            max_tokens,
            "레인지 검증 요청"
        );
        let text = tokio::time::timeout(self.policy.call_timeout, self.service.complete(&request))
            .await
            .map_err(|_| AiError::Timeout(self.policy.call_timeout))??;

        parse_model_response(&text, fallback_range)
    }
}

fn success(
    at_index: usize,
    at_time: i64,
    model: &str,
    used_fallback: bool,
    verdict: ParsedVerdict,
    config: &AiConfig,
) -> AiEvaluation {
    AiEvaluation {
        at_index,
        at_time,
        final_model: model.to_string(),
        used_fallback,
        is_ranging: verdict.is_ranging,
        confidence: verdict.confidence,
        accepted: verdict.is_ranging && verdict.confidence >= config.confidence_threshold,
        range: verdict.range,
        reasons: verdict.reasons,
        error_message: None,
    }
}

fn failure(
    at_index: usize,
    at_time: i64,
    config: &AiConfig,
    fallback_attempted: bool,
    range: RangeLevels,
    last_error: &AiError,
) -> AiEvaluation {
    AiEvaluation {
        at_index,
        at_time,
        final_model: config.model_fallback.clone(),
        used_fallback: fallback_attempted,
        is_ranging: false,
        confidence: 0.0,
        accepted: false,
        range,
        reasons: vec![AI_VALIDATION_FAILED.to_string()],
        error_message: Some(truncate_chars(&last_error.to_string(), MAX_ERROR_CHARS)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escalated_budget_is_capped() {
        assert_eq!(escalated_budget(700), 1400);
        assert_eq!(escalated_budget(1500), 2000);
        assert_eq!(escalated_budget(u32::MAX), 2000);
    }
}
