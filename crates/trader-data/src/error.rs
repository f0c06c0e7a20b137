//! 데이터 계층 에러 타입.

use thiserror::Error;
use trader_core::{ProviderError, StoreError, Timeframe};

/// 캔들 해석/캐시 에러.
///
/// 잡 단위 in-flight 공유 future로 여러 소비자에게 전달되므로 `Clone`입니다.
#[derive(Debug, Clone, Error)]
pub enum DataError {
    /// 업스트림 캔들 제공자 실패
    #[error("캔들 조회 실패 [{symbol} {timeframe}]: {message}")]
    Upstream {
        symbol: String,
        timeframe: Timeframe,
        message: String,
    },

    /// 정규화 후 캔들이 하나도 없음
    #[error("캔들 데이터 없음 [{symbol} {timeframe}]")]
    EmptyWindow { symbol: String, timeframe: Timeframe },

    /// 블롭 저장소 에러
    #[error("캐시 저장소 에러: {0}")]
    CacheStore(String),

    /// 블롭 디코딩 에러
    #[error("캐시 디코딩 에러: {0}")]
    Decode(String),
}

impl DataError {
    pub(crate) fn upstream(symbol: &str, timeframe: Timeframe, err: ProviderError) -> Self {
        Self::Upstream {
            symbol: symbol.to_string(),
            timeframe,
            message: err.to_string(),
        }
    }

    /// 잡을 실패시키는 에러인지 여부.
    ///
    /// 캐시 저장소/디코딩 에러는 캐시 없이 진행하면 되므로 치명적이지 않습니다.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Upstream { .. } | Self::EmptyWindow { .. })
    }
}

impl From<StoreError> for DataError {
    fn from(err: StoreError) -> Self {
        Self::CacheStore(err.to_string())
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, DataError>;
