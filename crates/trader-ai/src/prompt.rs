//! 레인지 검증 프롬프트 구성.

use serde::Serialize;
use serde_json::{json, Value};
use trader_core::{Candle, RangeLevels, Timeframe};

/// 시스템 프롬프트. 응답 스키마를 고정합니다.
pub const SYSTEM_PROMPT: &str = "You are a market-structure analyst validating whether a price window is a \
horizontal trading range (mean-reverting, bounded by a value area) rather than a trend. \
You receive a JSON payload with the symbol, timeframe, window bounds, a deterministic \
volume-profile range, a compact summary and raw OHLCV rows [t,o,h,l,c,v]. \
Answer with a single JSON object and nothing else, using exactly this schema: \
{\"isRanging\": boolean, \"confidence\": number between 0 and 1, \
\"range\": {\"val\": number, \"poc\": number, \"vah\": number}, \
\"reasons\": [short strings, at most 6]}. \
The range must describe value-area low, point of control and value-area high of the window. \
If unsure, set isRanging to false and lower the confidence.";

/// 윈도우 요약 통계.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSummary {
    pub bars: usize,
    pub first_open_time: i64,
    pub last_open_time: i64,
    pub highest_high: f64,
    pub lowest_low: f64,
    pub range_width: f64,
    /// 마지막 종가 대비 폭 (%)
    pub range_width_pct: f64,
    pub average_volume: f64,
}

/// 윈도우 요약 계산. 빈 윈도우는 `None`.
pub fn summarize(window: &[Candle]) -> Option<WindowSummary> {
    let first = window.first()?;
    let last = window.last()?;

    let highest_high = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
    let lowest_low = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    let range_width = highest_high - lowest_low;
    let range_width_pct = if last.close.abs() > f64::EPSILON {
        range_width / last.close * 100.0
    } else {
        0.0
    };
    let average_volume = window.iter().map(|c| c.volume).sum::<f64>() / window.len() as f64;

    Some(WindowSummary {
        bars: window.len(),
        first_open_time: first.open_time,
        last_open_time: last.open_time,
        highest_high,
        lowest_low,
        range_width,
        range_width_pct,
        average_volume,
    })
}

/// 사용자 메시지 페이로드 구성.
pub fn build_payload(
    symbol: &str,
    timeframe: Timeframe,
    window: &[Candle],
    deterministic: RangeLevels,
) -> Value {
    let rows: Vec<[Value; 6]> = window
        .iter()
        .map(|c| {
            [
                json!(c.open_time),
                json!(c.open),
                json!(c.high),
                json!(c.low),
                json!(c.close),
                json!(c.volume),
            ]
        })
        .collect();

    json!({
        "symbol": symbol,
        "timeframe": timeframe.as_str(),
        "window": {
            "fromMs": window.first().map(|c| c.open_time),
            "toMs": window.last().map(|c| c.open_time),
        },
        "deterministicRange": {
            "val": deterministic.val,
            "poc": deterministic.poc,
            "vah": deterministic.vah,
        },
        "summary": summarize(window),
        "rows": rows,
    })
}
