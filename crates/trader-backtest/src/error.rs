//! 백테스트 잡 에러 타입.

use thiserror::Error;
use trader_ai::AiError;
use trader_core::{StoreError, StrategyError};
use trader_data::DataError;

/// 잡 파이프라인 에러.
///
/// [`crate::BacktestJobRunner::run`]이 유일하게 이 에러를 종료 레코드로 변환합니다.
#[derive(Debug, Clone, Error)]
pub enum JobError {
    /// 입력/트리거 페이로드 검증 실패
    #[error("입력 검증 실패: {0}")]
    Validation(String),

    /// 캔들 업스트림 조회 실패
    #[error("캔들 조회 실패: {0}")]
    UpstreamFetch(String),

    /// 캔들 캐시 저장소 에러
    #[error("캐시 저장소 에러: {0}")]
    CacheStore(String),

    /// 개별 AI 평가 실패 (잡은 계속 진행)
    #[error("AI 평가 실패: {0}")]
    AiEvaluation(String),

    /// AI 활성화 상태인데 completion 서비스가 없음
    #[error("AI 설정 에러: {0}")]
    AiConfiguration(String),

    /// 전략 엔진 실패
    #[error("전략 계산 실패: {0}")]
    StrategyComputation(String),

    /// 리플레이 중 부분 실패
    #[error("리플레이 경고: {0}")]
    Replay(String),

    /// 레코드 저장소 에러
    #[error("레코드 저장소 에러: {0}")]
    Store(String),
}

impl JobError {
    /// 잡을 실패시키는 에러인지 여부.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::UpstreamFetch(_)
                | Self::AiConfiguration(_)
                | Self::StrategyComputation(_)
                | Self::Store(_)
        )
    }
}

impl From<DataError> for JobError {
    fn from(err: DataError) -> Self {
        match err {
            DataError::Upstream { .. } | DataError::EmptyWindow { .. } => {
                Self::UpstreamFetch(err.to_string())
            }
            DataError::CacheStore(_) | DataError::Decode(_) => Self::CacheStore(err.to_string()),
        }
    }
}

impl From<StrategyError> for JobError {
    fn from(err: StrategyError) -> Self {
        Self::StrategyComputation(err.to_string())
    }
}

impl From<StoreError> for JobError {
    fn from(err: StoreError) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<AiError> for JobError {
    fn from(err: AiError) -> Self {
        if err.is_configuration() {
            Self::AiConfiguration(err.to_string())
        } else {
            Self::AiEvaluation(err.to_string())
        }
    }
}

impl From<validator::ValidationErrors> for JobError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, JobError>;

#[cfg(test)]
mod tests {
    use super::*;
    use trader_core::Timeframe;

    #[test]
    fn strategy_message_is_preserved() {
        let err: JobError = StrategyError::InsufficientCandles {
            required: 80,
            actual: 12,
        }
        .into();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("insufficient candles: need 80, got 12"));
    }

    #[test]
    fn cache_errors_are_not_fatal() {
        let fetch: JobError = DataError::EmptyWindow {
            symbol: "BTCUSDT".into(),
            timeframe: Timeframe::H1,
        }
        .into();
        let cache: JobError = DataError::Decode("bad".into()).into();
        assert!(fetch.is_fatal());
        assert!(!cache.is_fatal());
        assert!(!JobError::AiEvaluation("x".into()).is_fatal());
        assert!(!JobError::Replay("x".into()).is_fatal());
    }
}
