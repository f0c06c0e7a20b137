//! AI 레인지 검증 설정 및 결과 타입.
//!
//! # 설정 기본값
//!
//! | 필드                  | 기본값               | 정규화                              |
//! |-----------------------|----------------------|-------------------------------------|
//! | `enabled`             | `false`              | -                                   |
//! | `lookbackCandles`     | `120`                | `[60, 500]`로 제한                  |
//! | `cadenceBars`         | `12`                 | `[1, 10000]`로 제한                 |
//! | `maxEvaluations`      | `24`                 | `[1, 200]`으로 제한                 |
//! | `confidenceThreshold` | `0.72`               | 유한하지 않으면 기본값, `[0, 1]`    |
//! | `modelPrimary`        | `openai/gpt-4o-mini` | 공백 제거, 비어있으면 기본값        |
//! | `modelFallback`       | `openai/gpt-4o`      | 공백 제거, 비어있으면 기본값        |

use serde::{Deserialize, Serialize};

use super::candle::RangeLevels;

/// 설정 기본값 및 한계값.
pub mod defaults {
    pub const ENABLED: bool = false;
    pub const LOOKBACK_CANDLES: usize = 120;
    pub const CADENCE_BARS: usize = 12;
    pub const MAX_EVALUATIONS: usize = 24;
    pub const CONFIDENCE_THRESHOLD: f64 = 0.72;
    pub const MODEL_PRIMARY: &str = "openai/gpt-4o-mini";
    pub const MODEL_FALLBACK: &str = "openai/gpt-4o";

    /// 최소 룩백 (이보다 짧은 윈도우는 평가하지 않음)
    pub const LOOKBACK_FLOOR: usize = 60;
    pub const LOOKBACK_MAX: usize = 500;
    pub const CADENCE_MAX: usize = 10_000;
    pub const MAX_EVALUATIONS_CAP: usize = 200;

    /// 모델 응답 reasons 최대 개수
    pub const MAX_REASONS: usize = 6;
    /// reason 하나당 최대 문자 수
    pub const MAX_REASON_CHARS: usize = 96;
}

/// 사용자/트리거가 전달하는 부분 설정.
///
/// 모든 필드가 선택적이며 [`AiConfig::normalize`]를 거쳐 완전한 설정이 됩니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiConfigInput {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub lookback_candles: Option<i64>,
    #[serde(default)]
    pub cadence_bars: Option<i64>,
    #[serde(default)]
    pub max_evaluations: Option<i64>,
    #[serde(default)]
    pub confidence_threshold: Option<f64>,
    #[serde(default)]
    pub model_primary: Option<String>,
    #[serde(default)]
    pub model_fallback: Option<String>,
}

/// 정규화된 AI 설정 (불변).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiConfig {
    pub enabled: bool,
    pub lookback_candles: usize,
    pub cadence_bars: usize,
    pub max_evaluations: usize,
    pub confidence_threshold: f64,
    pub model_primary: String,
    pub model_fallback: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self::normalize(&AiConfigInput::default())
    }
}

impl AiConfig {
    /// 부분 설정을 기본값으로 채우고 한계값으로 제한합니다.
    pub fn normalize(input: &AiConfigInput) -> Self {
        Self {
            enabled: input.enabled.unwrap_or(defaults::ENABLED),
            lookback_candles: clamp_count(
                input.lookback_candles,
                defaults::LOOKBACK_CANDLES,
                defaults::LOOKBACK_FLOOR,
                defaults::LOOKBACK_MAX,
            ),
            cadence_bars: clamp_count(
                input.cadence_bars,
                defaults::CADENCE_BARS,
                1,
                defaults::CADENCE_MAX,
            ),
            max_evaluations: clamp_count(
                input.max_evaluations,
                defaults::MAX_EVALUATIONS,
                1,
                defaults::MAX_EVALUATIONS_CAP,
            ),
            confidence_threshold: input
                .confidence_threshold
                .filter(|v| v.is_finite())
                .unwrap_or(defaults::CONFIDENCE_THRESHOLD)
                .clamp(0.0, 1.0),
            model_primary: model_or_default(&input.model_primary, defaults::MODEL_PRIMARY),
            model_fallback: model_or_default(&input.model_fallback, defaults::MODEL_FALLBACK),
        }
    }
}

fn clamp_count(value: Option<i64>, default: usize, min: usize, max: usize) -> usize {
    match value {
        Some(v) if v > 0 => (v as u64).clamp(min as u64, max as u64) as usize,
        // 0 이하는 의미 없는 값이므로 하한으로
        Some(_) => min,
        None => default,
    }
}

fn model_or_default(value: &Option<String>, default: &str) -> String {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(default)
        .to_string()
}

/// 레벨 세 개를 오름차순으로 정렬 (모델이 보고한 순서는 신뢰하지 않음).
pub fn sanitize_range(a: f64, b: f64, c: f64) -> RangeLevels {
    RangeLevels::sorted(a, b, c)
}

/// 신뢰도를 `[0, 1]`로 제한. 유한하지 않으면 0.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// reasons를 최대 6개, 각 96자로 자릅니다. 빈 문자열은 제거.
pub fn sanitize_reasons<I, S>(reasons: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    reasons
        .into_iter()
        .map(|r| r.as_ref().trim().to_string())
        .filter(|r| !r.is_empty())
        .take(defaults::MAX_REASONS)
        .map(|r| r.chars().take(defaults::MAX_REASON_CHARS).collect())
        .collect()
}

/// AI 검증 실패 시 reasons 값.
pub const AI_VALIDATION_FAILED: &str = "ai_validation_failed";

/// 한 시점(bar index)에 대한 레인지 검증 결과.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiEvaluation {
    pub at_index: usize,
    /// 평가 시점 캔들의 시작 시각 (epoch ms)
    pub at_time: i64,
    pub final_model: String,
    pub used_fallback: bool,
    pub is_ranging: bool,
    pub confidence: f64,
    pub accepted: bool,
    pub range: RangeLevels,
    pub reasons: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl AiEvaluation {
    /// 두 모델 모두 실패한 평가인지 여부.
    pub fn is_failure(&self) -> bool {
        self.error_message.is_some()
    }
}

/// 잡 단위 AI 검증 요약. 진행 중에 단조 증가합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSummary {
    #[serde(flatten)]
    pub config: AiConfig,
    pub effective_cadence_bars: usize,
    pub planned_evaluations: usize,
    pub evaluations_run: usize,
    pub evaluations_accepted: usize,
    pub fallback_used: usize,
    pub failed: usize,
    #[serde(default)]
    pub evaluations: Vec<AiEvaluation>,
}

impl AiSummary {
    /// 계획 직후의 빈 요약.
    pub fn planned(config: AiConfig, effective_cadence_bars: usize, planned: usize) -> Self {
        Self {
            config,
            effective_cadence_bars,
            planned_evaluations: planned,
            evaluations_run: 0,
            evaluations_accepted: 0,
            fallback_used: 0,
            failed: 0,
            evaluations: Vec::new(),
        }
    }

    /// 평가 하나를 반영합니다.
    pub fn record(&mut self, evaluation: AiEvaluation) {
        self.evaluations_run += 1;
        if evaluation.accepted {
            self.evaluations_accepted += 1;
        }
        if evaluation.is_failure() {
            self.failed += 1;
        } else if evaluation.used_fallback {
            self.fallback_used += 1;
        }
        self.evaluations.push(evaluation);
    }
}
