//! 캔들 데이터 제공자 구현.

pub mod binance;

pub use binance::{BinanceKlineConfig, BinanceKlineProvider};
