//! 모델 응답 파싱.
//!
//! 모델은 지시를 잘 어기므로 추출 전략을 순서대로 시도합니다:
//! 1. 응답 전체를 JSON으로
//! 2. 첫 번째 ```` ```json ```` 코드 블록
//! 3. 아무 코드 블록
//!
//! 최종 페이로드는 JSON 객체여야 합니다.

use serde_json::{Map, Value};
use trader_core::{clamp_confidence, sanitize_range, sanitize_reasons, RangeLevels};

use crate::error::{AiError, Result};

/// 텍스트에서 JSON 객체를 꺼내는 전략.
pub type TextExtractor = fn(&str) -> Option<Map<String, Value>>;

/// 추출 전략 목록 (순서대로 시도).
pub const TEXT_EXTRACTORS: &[(&str, TextExtractor)] = &[
    ("raw", extract_raw),
    ("json_fence", extract_json_fence),
    ("any_fence", extract_any_fence),
];

/// 정리된 모델 판정.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedVerdict {
    pub is_ranging: bool,
    /// `[0, 1]`
    pub confidence: f64,
    /// 항상 `val <= poc <= vah`
    pub range: RangeLevels,
    pub reasons: Vec<String>,
}

/// 모델 응답 텍스트 파싱.
///
/// 레인지가 없거나 유한하지 않으면 `fallback`을 사용합니다.
pub fn parse_model_response(text: &str, fallback: RangeLevels) -> Result<ParsedVerdict> {
    let obj = TEXT_EXTRACTORS
        .iter()
        .find_map(|(_, extract)| extract(text))
        .ok_or_else(|| AiError::Parse(format!("JSON 객체 없음: {}", preview(text))))?;

    let is_ranging = ["isRanging", "is_ranging", "ranging"]
        .iter()
        .find_map(|k| obj.get(*k).and_then(as_bool))
        .ok_or_else(|| AiError::Parse("isRanging 누락".to_string()))?;

    let confidence = obj
        .get("confidence")
        .and_then(as_number)
        .ok_or_else(|| AiError::Parse("confidence 누락".to_string()))?;

    let range = obj
        .get("range")
        .and_then(Value::as_object)
        .and_then(range_levels)
        .unwrap_or(fallback);

    let reasons = match obj.get("reasons") {
        Some(Value::Array(items)) => sanitize_reasons(items.iter().filter_map(Value::as_str)),
        Some(Value::String(s)) => sanitize_reasons([s.as_str()]),
        _ => Vec::new(),
    };

    Ok(ParsedVerdict {
        is_ranging,
        confidence: clamp_confidence(confidence),
        range,
        reasons,
    })
}

// =============================================================================
// 추출 전략
// =============================================================================

fn extract_raw(text: &str) -> Option<Map<String, Value>> {
    as_object(text.trim())
}

fn extract_json_fence(text: &str) -> Option<Map<String, Value>> {
    let lower = text.to_ascii_lowercase();
    let start = lower.find("```json")? + "```json".len();
    let rest = &text[start..];
    let end = rest.find("```")?;
    as_object(rest[..end].trim())
}

fn extract_any_fence(text: &str) -> Option<Map<String, Value>> {
    let start = text.find("```")? + 3;
    let rest = &text[start..];
    // 언어 태그 줄 건너뛰기
    let body_start = rest.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &rest[body_start..];
    let end = body.find("```")?;
    as_object(body[..end].trim())
}

fn as_object(candidate: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(candidate).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

// =============================================================================
// 필드 변환
// =============================================================================

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn range_levels(obj: &Map<String, Value>) -> Option<RangeLevels> {
    let val = obj.get("val").and_then(as_number)?;
    let poc = obj.get("poc").and_then(as_number)?;
    let vah = obj.get("vah").and_then(as_number)?;
    let levels = sanitize_range(val, poc, vah);
    levels.is_finite().then_some(levels)
}

fn preview(text: &str) -> String {
    text.chars().take(120).collect()
}
