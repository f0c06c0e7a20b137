//! 블롭 저장소 키 규칙.
//!
//! ```text
//! 공유 윈도우 키: klines/{SYMBOL}/{tf}/{fromMs}-{toMs}.json
//! 잡 전용 키:     backtests/{jobId}/klines/{SYMBOL}_{tf}_{fromMs}_{toMs}.json
//! ```
//!
//! 경로 세그먼트는 `[A-Za-z0-9._-]`만 허용하며 나머지 문자는 `_`로 바뀝니다.

use trader_core::Timeframe;

/// 경로 세그먼트 정리.
///
/// 허용되지 않는 문자는 `_`로 치환하고, 빈 문자열은 `_` 하나가 됩니다.
pub fn sanitize_segment(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    // ".", ".." 같은 상대 경로 세그먼트 차단
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        "_".repeat(cleaned.len().max(1))
    } else {
        cleaned
    }
}

/// 심볼 정규화 (대문자 + 세그먼트 정리).
pub fn symbol_segment(symbol: &str) -> String {
    sanitize_segment(&symbol.trim().to_uppercase())
}

/// 여러 잡이 공유하는 윈도우 키.
pub fn window_key(symbol: &str, timeframe: Timeframe, from_ms: i64, to_ms: i64) -> String {
    format!(
        "klines/{}/{}/{}-{}.json",
        symbol_segment(symbol),
        sanitize_segment(timeframe.as_str()),
        from_ms,
        to_ms
    )
}

/// 잡 전용 키.
pub fn job_key(job_id: &str, symbol: &str, timeframe: Timeframe, from_ms: i64, to_ms: i64) -> String {
    format!(
        "backtests/{}/klines/{}_{}_{}_{}.json",
        sanitize_segment(job_id),
        symbol_segment(symbol),
        sanitize_segment(timeframe.as_str()),
        from_ms,
        to_ms
    )
}

/// 외부에서 들어온 키 정규화 (공백 제거, 선행 `/` 제거).
pub fn normalize_key(key: &str) -> String {
    key.trim().trim_start_matches('/').to_string()
}
