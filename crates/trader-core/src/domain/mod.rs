//! 외부 협력자 인터페이스.
//!
//! - [`CandleProvider`]: 과거 캔들 원본 조회
//! - [`BlobStore`] / [`RecordStore`]: 캔들 블롭 / 잡 레코드 저장
//! - [`StrategyEngine`]: 전략 시뮬레이션 (순수 함수)

pub mod candle_provider;
pub mod storage;
pub mod strategy;

pub use candle_provider::{CandleProvider, ProviderError};
pub use storage::{BlobStore, RecordStore, StoreError};
pub use strategy::{
    BacktestTrade, ExitReason, SignalSnapshot, SnapshotInput, StrategyEngine, StrategyError,
    StrategyInput, StrategyOutput,
};
