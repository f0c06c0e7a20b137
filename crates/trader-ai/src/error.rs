//! LLM 호출 에러 타입.

use std::time::Duration;

use thiserror::Error;

/// AI 검증 에러.
///
/// 에스컬레이션 단계에서는 전송 실패와 파싱 실패를 같은 경로로 처리합니다.
#[derive(Debug, Clone, Error)]
pub enum AiError {
    /// 네트워크/전송 실패
    #[error("LLM 전송 실패: {0}")]
    Transport(String),

    /// 호출 타임아웃
    #[error("LLM 호출 타임아웃 ({0:?})")]
    Timeout(Duration),

    /// 비정상 HTTP 응답
    #[error("LLM API 에러 {status}: {body}")]
    Api { status: u16, body: String },

    /// 응답 파싱 실패
    #[error("LLM 응답 파싱 실패: {0}")]
    Parse(String),

    /// 설정 누락 (API 키 등)
    #[error("LLM 설정 에러: {0}")]
    Configuration(String),
}

impl AiError {
    /// 설정 에러 여부 (재시도해도 소용없음).
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, AiError>;
