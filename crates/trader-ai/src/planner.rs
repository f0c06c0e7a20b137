//! AI 평가 시점 계획.
//!
//! `maxEvaluations`는 절대 상한이고 `cadenceBars`는 하한일 뿐입니다.
//! 구간이 길면 실효 간격을 넓혀서 상한을 지킵니다.

use std::ops::Range;

use trader_core::ai::defaults::LOOKBACK_FLOOR;
use trader_core::AiConfig;

/// 평가 계획.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvaluationPlan {
    /// 평가할 실행 캔들 인덱스 (오름차순)
    pub indices: Vec<usize>,
    /// 실제 적용된 평가 간격
    pub effective_cadence_bars: usize,
}

impl EvaluationPlan {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }
}

/// 평가 계획 수립.
///
/// 캔들이 `LOOKBACK_FLOOR`보다 적으면 빈 계획입니다 (에러 아님).
pub fn plan(total_bars: usize, config: &AiConfig) -> EvaluationPlan {
    let cadence = config.cadence_bars.max(1);
    let max_evaluations = config.max_evaluations.max(1);

    if total_bars < LOOKBACK_FLOOR {
        return EvaluationPlan {
            indices: Vec::new(),
            effective_cadence_bars: cadence,
        };
    }

    let start = LOOKBACK_FLOOR - 1;
    let span = total_bars - start;
    let effective = cadence.max(span.div_ceil(max_evaluations));

    let mut indices: Vec<usize> = (start..total_bars).step_by(effective).collect();

    let last = total_bars - 1;
    if indices.last() != Some(&last) {
        if indices.len() < max_evaluations {
            indices.push(last);
        } else if let Some(tail) = indices.last_mut() {
            *tail = last;
        }
    }

    EvaluationPlan {
        indices,
        effective_cadence_bars: effective,
    }
}

/// 평가 시점 `at_index`의 룩백 윈도우 범위 (끝 포함 캔들까지).
pub fn window_bounds(at_index: usize, lookback: usize) -> Range<usize> {
    let end = at_index + 1;
    end.saturating_sub(lookback.max(1))..end
}
