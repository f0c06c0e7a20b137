//! 제공자 원본 행 → 캔들 정규화.
//!
//! 데이터 소스마다 행 형식이 다르므로, 작은 추출 전략들을 순서대로 시도하여
//! 처음 성공한 전략의 결과를 사용합니다.
//!
//! | 전략         | 형식                                                         |
//! |--------------|--------------------------------------------------------------|
//! | `array`      | `[openTime, open, high, low, close, volume, ...]` (Binance)   |
//! | `short_keys` | `{t, o, h, l, c, v}`                                         |
//! | `long_keys`  | `{openTime\|timestamp\|time, open, high, low, close, volume}` |
//!
//! 숫자는 JSON 숫자와 숫자 문자열 모두 허용합니다.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use trader_core::Candle;

/// 행 하나를 캔들로 추출하는 전략.
pub type RowExtractor = fn(&Value) -> Option<Candle>;

/// 추출 전략 목록 (순서대로 시도).
pub const ROW_EXTRACTORS: &[(&str, RowExtractor)] = &[
    ("array", extract_array_row),
    ("short_keys", extract_short_key_row),
    ("long_keys", extract_long_key_row),
];

/// 정규화 결과.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedRows {
    /// 오름차순, 시각 중복 없음
    pub candles: Vec<Candle>,
    /// 추출 실패 또는 값 검증 실패로 버린 행 수
    pub dropped: usize,
}

/// 원본 행 목록을 `[from_ms, to_ms]` 구간의 캔들 윈도우로 정규화.
///
/// 같은 시각의 행이 여러 개면 나중 행이 이깁니다.
pub fn normalize_rows(rows: &[Value], from_ms: i64, to_ms: i64) -> NormalizedRows {
    let mut by_time: BTreeMap<i64, Candle> = BTreeMap::new();
    let mut dropped = 0;

    for row in rows {
        match extract_row(row) {
            Some(candle) if candle.is_well_formed() => {
                if candle.open_time < from_ms || candle.open_time > to_ms {
                    continue;
                }
                by_time.insert(candle.open_time, candle);
            }
            _ => dropped += 1,
        }
    }

    NormalizedRows {
        candles: by_time.into_values().collect(),
        dropped,
    }
}

/// 이미 캔들 형태인 시리즈 정규화 (캐시 블롭 디코딩 후 사용).
///
/// 오버레이는 제거되며 구간 필터는 적용하지 않습니다.
pub fn normalize_candles(candles: Vec<Candle>) -> Vec<Candle> {
    let mut by_time: BTreeMap<i64, Candle> = BTreeMap::new();
    for mut candle in candles {
        if !candle.is_well_formed() {
            continue;
        }
        candle.range = None;
        by_time.insert(candle.open_time, candle);
    }
    by_time.into_values().collect()
}

/// 전략을 순서대로 시도하여 첫 성공 결과 반환.
pub fn extract_row(row: &Value) -> Option<Candle> {
    ROW_EXTRACTORS.iter().find_map(|(_, extract)| extract(row))
}

/// 행의 시작 시각만 추출 (페이지 커서 계산용).
pub fn extract_open_time(row: &Value) -> Option<i64> {
    extract_row(row).map(|c| c.open_time)
}

// =============================================================================
// 추출 전략
// =============================================================================

fn extract_array_row(row: &Value) -> Option<Candle> {
    let cols = row.as_array()?;
    if cols.len() < 6 {
        return None;
    }
    Some(Candle::new(
        as_millis(&cols[0])?,
        as_number(&cols[1])?,
        as_number(&cols[2])?,
        as_number(&cols[3])?,
        as_number(&cols[4])?,
        as_number(&cols[5])?,
    ))
}

fn extract_short_key_row(row: &Value) -> Option<Candle> {
    let obj = row.as_object()?;
    Some(Candle::new(
        as_millis(obj.get("t")?)?,
        as_number(obj.get("o")?)?,
        as_number(obj.get("h")?)?,
        as_number(obj.get("l")?)?,
        as_number(obj.get("c")?)?,
        as_number(obj.get("v")?)?,
    ))
}

fn extract_long_key_row(row: &Value) -> Option<Candle> {
    let obj = row.as_object()?;
    let time = first_key(obj, &["openTime", "timestamp", "time"])?;
    Some(Candle::new(
        as_millis(time)?,
        as_number(obj.get("open")?)?,
        as_number(obj.get("high")?)?,
        as_number(obj.get("low")?)?,
        as_number(obj.get("close")?)?,
        as_number(obj.get("volume")?)?,
    ))
}

fn first_key<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k))
}

fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn as_millis(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.fract() == 0.0)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn binance_array_rows_parse_with_string_numbers() {
        let row = json!([1_000, "100.5", "101", "99.5", "100.8", "12.3", 1_999, "0", 5]);
        let candle = extract_row(&row).unwrap();
        assert_eq!(candle.open_time, 1_000);
        assert_eq!(candle.open, 100.5);
        assert_eq!(candle.volume, 12.3);
    }

    #[test]
    fn short_and_long_key_rows_parse() {
        let short = json!({"t": 60_000, "o": 1, "h": 2, "l": 0.5, "c": 1.5, "v": 10});
        let long = json!({"timestamp": "120000", "open": 1, "high": 2, "low": 0.5, "close": 1.5, "volume": "3"});
        assert_eq!(extract_row(&short).unwrap().open_time, 60_000);
        let c = extract_row(&long).unwrap();
        assert_eq!(c.open_time, 120_000);
        assert_eq!(c.volume, 3.0);
    }

    #[test]
    fn malformed_rows_are_dropped() {
        let rows = vec![
            json!([0, 1, 2, 0.5, 1.5, 10]),
            json!([60_000, 1, 0.5, 2, 1.5, 10]), // high < low
            json!([120_000, 1, 2, 0.5, 1.5, -1]), // 음수 거래량
            json!({"foo": 1}),
            json!([180_000, "nan", 2, 0.5, 1.5, 1]),
        ];
        let out = normalize_rows(&rows, 0, i64::MAX);
        assert_eq!(out.candles.len(), 1);
        assert_eq!(out.dropped, 4);
    }

    #[test]
    fn duplicates_keep_later_row_and_output_is_sorted() {
        let rows = vec![
            json!([120_000, 1, 2, 0.5, 1.5, 1]),
            json!([0, 1, 2, 0.5, 1.5, 1]),
            json!([120_000, 1, 2, 0.5, 1.5, 99]),
        ];
        let out = normalize_rows(&rows, 0, i64::MAX);
        let times: Vec<i64> = out.candles.iter().map(|c| c.open_time).collect();
        assert_eq!(times, vec![0, 120_000]);
        assert_eq!(out.candles[1].volume, 99.0);
    }

    #[test]
    fn rows_outside_window_are_dropped() {
        let rows: Vec<Value> = (0..10).map(|i| json!([i * 1000, 1, 2, 0.5, 1.5, 1])).collect();
        let out = normalize_rows(&rows, 2_000, 5_000);
        assert_eq!(out.candles.len(), 4);
        assert_eq!(out.dropped, 0);
    }

    proptest! {
        #[test]
        fn normalized_windows_are_strictly_ascending(times in prop::collection::vec(0i64..500, 0..80)) {
            let rows: Vec<Value> = times.iter().map(|t| json!([t * 60_000, 1, 2, 0.5, 1.5, 1])).collect();
            let out = normalize_rows(&rows, 0, i64::MAX);
            prop_assert!(out.candles.windows(2).all(|w| w[0].open_time < w[1].open_time));
        }
    }
}
