//! 캔들 데이터 제공자 추상화.
//!
//! 거래소/데이터 소스로부터 과거 캔들 원본 행(row)을 조회하는
//! 소스 중립적인 인터페이스를 제공합니다. 행 형식 해석과 정규화는
//! 호출자(`trader-data`)가 담당합니다.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::Timeframe;

// =============================================================================
// 에러 타입
// =============================================================================

/// CandleProvider 에러.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// 네트워크 에러 (타임아웃 포함)
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// API 에러 (비정상 응답 코드 등)
    #[error("API 에러: {0}")]
    Api(String),

    /// 파싱 에러
    #[error("파싱 에러: {0}")]
    Parse(String),
}

// =============================================================================
// CandleProvider Trait
// =============================================================================

/// 과거 캔들 제공자 trait.
///
/// 한 번의 호출이 요청 구간 전체를 반환한다는 보장은 없습니다.
/// 페이지 단위로 일부만 돌려줄 수 있으며, 이어 붙이기는 호출자 책임입니다.
///
/// # 구현 예시
///
/// ```ignore
/// pub struct BinanceKlineProvider {
///     http: reqwest::Client,
/// }
///
/// #[async_trait]
/// impl CandleProvider for BinanceKlineProvider {
///     async fn fetch(&self, symbol: &str, timeframe: Timeframe, from_ms: i64, to_ms: i64)
///         -> Result<Vec<serde_json::Value>, ProviderError> {
///         // GET /api/v3/klines ...
///     }
///
///     fn provider_name(&self) -> &str { "binance" }
/// }
/// ```
#[async_trait]
pub trait CandleProvider: Send + Sync {
    /// `[from_ms, to_ms]` 구간의 원본 캔들 행 조회.
    ///
    /// # Errors
    ///
    /// - `ProviderError::Network`: 네트워크 연결 실패 또는 타임아웃
    /// - `ProviderError::Api`: 데이터 소스 API 에러
    /// - `ProviderError::Parse`: 응답 본문이 행 배열이 아님
    async fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<serde_json::Value>, ProviderError>;

    /// 데이터 제공자 이름 (로깅용).
    fn provider_name(&self) -> &str;
}
