//! 문자열 유틸리티.

/// 문자 단위로 최대 `max_chars`까지 자릅니다 (UTF-8 경계 안전).
pub fn truncate_chars(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}
