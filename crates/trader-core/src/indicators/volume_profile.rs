//! 캔들 기반 볼륨 프로파일 (VAL / POC / VAH).
//!
//! 틱 데이터 없이 캔들만으로 근사합니다. 각 캔들의 거래량을 고가~저가가
//! 걸치는 가격 버킷에 균등 분배한 뒤, 최대 거래량 버킷(POC)에서 시작해
//! 거래량이 더 많은 이웃 쪽으로 확장하여 가치 영역(Value Area)을 구합니다.

use crate::types::{Candle, RangeLevels};

/// 기본 가격 버킷 수.
pub const DEFAULT_BUCKETS: usize = 48;
/// 기본 가치 영역 비율 (전체 거래량의 70%).
pub const DEFAULT_VALUE_AREA_PCT: f64 = 0.70;

/// 기본 파라미터로 가치 영역 계산.
pub fn value_area(candles: &[Candle]) -> Option<RangeLevels> {
    value_area_with(candles, DEFAULT_BUCKETS, DEFAULT_VALUE_AREA_PCT)
}

/// 가치 영역 계산.
///
/// 캔들이 없거나, 가격 폭이 0이거나, 총 거래량이 0이면 `None`.
pub fn value_area_with(
    candles: &[Candle],
    bucket_count: usize,
    value_area_pct: f64,
) -> Option<RangeLevels> {
    let usable: Vec<&Candle> = candles.iter().filter(|c| c.is_well_formed()).collect();
    if usable.is_empty() || bucket_count == 0 {
        return None;
    }

    let y_min = usable.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    let y_max = usable.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
    let price_range = y_max - y_min;
    if !(price_range > 0.0) {
        return None;
    }

    let bucket_size = price_range / bucket_count as f64;
    let mut volumes = vec![0.0f64; bucket_count];

    for candle in &usable {
        let first = bucket_index(candle.low, y_min, bucket_size, bucket_count);
        let last = bucket_index(candle.high, y_min, bucket_size, bucket_count);
        let span = (last - first + 1) as f64;
        let per_bucket = candle.volume / span;
        for v in &mut volumes[first..=last] {
            *v += per_bucket;
        }
    }

    let total: f64 = volumes.iter().sum();
    if !(total > 0.0) {
        return None;
    }

    // 동률이면 낮은 가격 쪽 버킷을 POC로
    let mut poc_idx = 0;
    for (i, v) in volumes.iter().enumerate() {
        if *v > volumes[poc_idx] {
            poc_idx = i;
        }
    }

    let target = total * value_area_pct.clamp(0.0, 1.0);
    let (mut lo, mut hi) = (poc_idx, poc_idx);
    let mut covered = volumes[poc_idx];
    while covered < target && (lo > 0 || hi + 1 < bucket_count) {
        let below = if lo > 0 { volumes[lo - 1] } else { -1.0 };
        let above = if hi + 1 < bucket_count { volumes[hi + 1] } else { -1.0 };
        if above >= below {
            hi += 1;
            covered += volumes[hi];
        } else {
            lo -= 1;
            covered += volumes[lo];
        }
    }

    let val = y_min + lo as f64 * bucket_size;
    let vah = y_min + (hi + 1) as f64 * bucket_size;
    let poc = y_min + (poc_idx as f64 + 0.5) * bucket_size;
    Some(RangeLevels::sorted(val, poc, vah))
}

/// 프로파일 계산이 불가능할 때의 단순 레벨 (최저가 / 중간값 / 최고가).
///
/// 캔들이 하나도 없으면 `None`.
pub fn extremes_levels(candles: &[Candle]) -> Option<RangeLevels> {
    let usable: Vec<&Candle> = candles.iter().filter(|c| c.is_well_formed()).collect();
    if usable.is_empty() {
        return None;
    }
    let low = usable.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    let high = usable.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
    Some(RangeLevels::sorted(low, (low + high) / 2.0, high))
}

/// 가치 영역, 실패 시 극값 레벨.
pub fn deterministic_levels(candles: &[Candle]) -> Option<RangeLevels> {
    value_area(candles).or_else(|| extremes_levels(candles))
}

fn bucket_index(price: f64, y_min: f64, bucket_size: f64, bucket_count: usize) -> usize {
    let idx = ((price - y_min) / bucket_size).floor();
    if idx <= 0.0 {
        0
    } else {
        (idx as usize).min(bucket_count - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(i: i64, low: f64, high: f64, volume: f64) -> Candle {
        let mid = (low + high) / 2.0;
        Candle::new(i * 60_000, mid, high, low, mid, volume)
    }

    #[test]
    fn empty_or_flat_input_has_no_profile() {
        assert!(value_area(&[]).is_none());
        let flat = vec![candle(0, 100.0, 100.0, 10.0), candle(1, 100.0, 100.0, 5.0)];
        assert!(value_area(&flat).is_none());
        let levels = deterministic_levels(&flat).unwrap();
        assert_eq!(levels.val, 100.0);
        assert_eq!(levels.vah, 100.0);
    }

    #[test]
    fn poc_sits_where_volume_concentrates() {
        let mut candles = vec![candle(0, 90.0, 110.0, 1.0)];
        for i in 1..40 {
            candles.push(candle(i, 99.0, 101.0, 50.0));
        }
        let levels = value_area(&candles).unwrap();
        assert!(levels.poc > 98.0 && levels.poc < 102.0, "poc={}", levels.poc);
        assert!(levels.val >= 90.0 && levels.vah <= 110.0);
        assert!(levels.val <= levels.poc && levels.poc <= levels.vah);
    }

    #[test]
    fn value_area_covers_requested_share() {
        let candles: Vec<Candle> = (0..60)
            .map(|i| {
                let base = 100.0 + (i % 10) as f64;
                candle(i, base - 1.0, base + 1.0, 10.0 + i as f64)
            })
            .collect();
        let full = value_area_with(&candles, 48, 1.0).unwrap();
        let seventy = value_area_with(&candles, 48, 0.7).unwrap();
        assert!(seventy.width() <= full.width());
        assert!((full.val - 99.0).abs() < 1e-9);
        assert!((full.vah - 110.0).abs() < 1e-9);
    }
}
