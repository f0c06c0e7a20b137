//! AI 평가 결과를 실행 캔들에 덧씌우기.

use trader_core::{AiEvaluation, Candle, RangeOverlay};

/// 각 캔들은 자신의 인덱스 이하에서 가장 최근 평가의 레인지를 물려받습니다.
///
/// 첫 평가 이전 캔들은 그대로 둡니다. `rangeValid`는 해당 평가의 `accepted`.
pub fn apply_overlay(candles: &mut [Candle], evaluations: &[AiEvaluation]) {
    let mut ordered: Vec<&AiEvaluation> = evaluations.iter().collect();
    ordered.sort_by_key(|e| e.at_index);

    let mut cursor = 0;
    let mut current: Option<RangeOverlay> = None;
    for (i, candle) in candles.iter_mut().enumerate() {
        while cursor < ordered.len() && ordered[cursor].at_index <= i {
            let eval = ordered[cursor];
            current = Some(RangeOverlay::new(eval.accepted, eval.range));
            cursor += 1;
        }
        if let Some(overlay) = current {
            candle.range = Some(overlay);
        }
    }
}

/// 복사본에 오버레이 적용.
pub fn overlaid(candles: &[Candle], evaluations: &[AiEvaluation]) -> Vec<Candle> {
    let mut out = candles.to_vec();
    apply_overlay(&mut out, evaluations);
    out
}
