//! 저장소 추상화 (블롭 / 잡 레코드).

use async_trait::async_trait;
use thiserror::Error;

use crate::types::BacktestRecord;

/// 저장소 에러.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// I/O 에러
    #[error("저장소 I/O 에러: {0}")]
    Io(String),

    /// 직렬화/역직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),

    /// 저장소 사용 불가
    #[error("저장소 사용 불가: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// 키-바이트 블롭 저장소.
///
/// 같은 키에는 항상 같은 바이트가 저장된다고 가정합니다(멱등).
/// 따라서 같은 키에 대한 동시 쓰기는 문제가 되지 않습니다.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// 키 조회. 없으면 `Ok(None)`.
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// 키에 바이트 저장 (덮어쓰기).
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<(), StoreError>;

    /// 표시용 URL (저장소가 지원하지 않으면 `None`).
    fn public_url(&self, _key: &str) -> Option<String> {
        None
    }
}

/// 백테스트 레코드 저장소.
///
/// 식별자(id)당 단일 작성자를 관례로 하며 별도 잠금은 없습니다.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<BacktestRecord>, StoreError>;

    async fn put(&self, record: &BacktestRecord) -> Result<(), StoreError>;
}
