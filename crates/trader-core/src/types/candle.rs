//! OHLCV 캔들과 레인지 오버레이.

use serde::{Deserialize, Serialize};

use super::timeframe::Timeframe;

/// 하나의 OHLCV 캔들.
///
/// `range`는 AI 검증 결과를 캔들에 덧씌운 값이며, 캐시에 저장되는
/// 원본 캔들에는 존재하지 않습니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candle {
    /// 캔들 시작 시각 (epoch ms)
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    /// AI 레인지 오버레이
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<RangeOverlay>,
}

impl Candle {
    pub fn new(open_time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            open_time,
            open,
            high,
            low,
            close,
            volume,
            range: None,
        }
    }

    /// 모든 가격/거래량이 유한하고 `high >= low`, `volume >= 0` 인지 확인.
    pub fn is_well_formed(&self) -> bool {
        let finite = [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite());
        finite && self.high >= self.low && self.volume >= 0.0
    }
}

/// `at` 시각까지 마감된 앞부분 (캔들은 오름차순).
///
/// 아직 진행 중인 상위 타임프레임 봉은 제외합니다.
pub fn closed_by(candles: &[Candle], timeframe: Timeframe, at: i64) -> &[Candle] {
    let step = timeframe.duration_ms();
    let end = candles.partition_point(|c| c.open_time.saturating_add(step) <= at);
    &candles[..end]
}

/// 볼륨 프로파일 기반 가격 레벨 (VAL / POC / VAH).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeLevels {
    pub val: f64,
    pub poc: f64,
    pub vah: f64,
}

impl RangeLevels {
    /// 세 값을 오름차순으로 정렬하여 생성.
    ///
    /// 입력 순서와 무관하게 항상 `val <= poc <= vah`가 보장됩니다.
    pub fn sorted(a: f64, b: f64, c: f64) -> Self {
        let mut levels = [a, b, c];
        levels.sort_by(|x, y| x.total_cmp(y));
        Self {
            val: levels[0],
            poc: levels[1],
            vah: levels[2],
        }
    }

    pub fn is_finite(&self) -> bool {
        self.val.is_finite() && self.poc.is_finite() && self.vah.is_finite()
    }

    pub fn width(&self) -> f64 {
        self.vah - self.val
    }
}

/// 캔들에 덧씌워지는 AI 레인지 피처.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeOverlay {
    /// AI가 레인지 시장으로 확인했는지 여부
    pub range_valid: bool,
    pub val: f64,
    pub poc: f64,
    pub vah: f64,
}

impl RangeOverlay {
    pub fn new(range_valid: bool, levels: RangeLevels) -> Self {
        Self {
            range_valid,
            val: levels.val,
            poc: levels.poc,
            vah: levels.vah,
        }
    }

    pub fn levels(&self) -> RangeLevels {
        RangeLevels {
            val: self.val,
            poc: self.poc,
            vah: self.vah,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sorted_levels_handle_any_order() {
        let levels = RangeLevels::sorted(105.0, 95.0, 100.0);
        assert_eq!(levels.val, 95.0);
        assert_eq!(levels.poc, 100.0);
        assert_eq!(levels.vah, 105.0);
    }

    #[test]
    fn well_formed_rejects_inverted_and_nan() {
        assert!(Candle::new(0, 1.0, 2.0, 0.5, 1.5, 10.0).is_well_formed());
        assert!(!Candle::new(0, 1.0, 0.4, 0.5, 1.5, 10.0).is_well_formed());
        assert!(!Candle::new(0, f64::NAN, 2.0, 0.5, 1.5, 10.0).is_well_formed());
        assert!(!Candle::new(0, 1.0, 2.0, 0.5, 1.5, -1.0).is_well_formed());
    }

    #[test]
    fn closed_by_excludes_bar_still_open() {
        let hour = Timeframe::H1.duration_ms();
        let candles: Vec<Candle> = (0..4)
            .map(|i| Candle::new(i * hour, 1.0, 2.0, 0.5, 1.5, 1.0))
            .collect();
        // 01:45 시점: 01:00 봉은 아직 진행 중
        let at = hour + 45 * 60_000;
        assert_eq!(closed_by(&candles, Timeframe::H1, at).len(), 1);
        assert_eq!(closed_by(&candles, Timeframe::H1, 2 * hour).len(), 2);
        assert!(closed_by(&candles, Timeframe::H1, hour - 1).is_empty());
    }

    #[test]
    fn overlay_is_omitted_from_json_when_absent() {
        let candle = Candle::new(1_700_000_000_000, 1.0, 2.0, 0.5, 1.5, 10.0);
        let json = serde_json::to_value(&candle).unwrap();
        assert!(json.get("range").is_none());
        assert_eq!(json["openTime"], 1_700_000_000_000i64);
    }
}
