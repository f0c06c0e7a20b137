//! 캔들 데이터 계층.
//!
//! - [`cache`]: 캔들 윈도우 해석 (알려진 참조 → 공유 키 → 업스트림), 잡 단위 중복 제거
//! - [`normalize`]: 제공자 원본 행 → 정렬/중복 제거된 캔들
//! - [`storage`]: 블롭/레코드 저장소 구현 (인메모리, 파일시스템)
//! - [`provider`]: HTTP 캔들 제공자

pub mod cache;
pub mod error;
pub mod keys;
pub mod normalize;
pub mod provider;
pub mod storage;

pub use cache::{
    dedupe_refs, CandleSource, JobKlineLoader, KlineResolver, ResolvedWindow, ResolverConfig,
    WindowRequest,
};
pub use error::{DataError, Result};
pub use provider::{BinanceKlineConfig, BinanceKlineProvider};
pub use storage::{FsBlobStore, FsRecordStore, InMemoryBlobStore, InMemoryRecordStore};
