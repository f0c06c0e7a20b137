//! 공용 도메인 타입.

pub mod ai;
pub mod candle;
pub mod record;
pub mod timeframe;

pub use ai::{
    clamp_confidence, sanitize_range, sanitize_reasons, AiConfig, AiConfigInput, AiEvaluation,
    AiSummary, AI_VALIDATION_FAILED,
};
pub use candle::{closed_by, Candle, RangeLevels, RangeOverlay};
pub use record::{BacktestMetrics, BacktestRecord, BacktestStatus, KlineCacheReference};
pub use timeframe::{ParseTimeframeError, Timeframe};
