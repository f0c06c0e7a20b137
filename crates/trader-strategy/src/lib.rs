//! 백테스트용 전략 엔진.
//!
//! [`RangeReversionEngine`]은 `StrategyEngine` 계약을 구현하는 결정론적
//! 참조 엔진으로, CLI와 파이프라인 테스트가 사용합니다.

pub mod metrics;
pub mod range_reversion;

pub use range_reversion::{RangeReversionConfig, RangeReversionEngine};
