//! 백테스트 잡 오케스트레이션.
//!
//! - [`job`]: running → completed/failed 상태 머신 ([`BacktestJobRunner`])
//! - [`trigger`]: 이벤트 트리거 페이로드 검증
//! - [`replay`]: 저장된 잡의 결정론적 재계산
//! - [`observer`]: AI 진행 상황 통지
//!
//! # 사용 예
//!
//! ```ignore
//! let ctx = JobContext::new(blobs, records, provider, engine).with_completion(llm);
//! let runner = BacktestJobRunner::new(ctx);
//! let record = runner.run(input, None, Some(&LoggingObserver::new())).await;
//! ```

pub mod context;
pub mod error;
pub mod input;
pub mod job;
pub mod observer;
pub mod overlay;
pub mod replay;
pub mod trigger;

pub use context::JobContext;
pub use error::{JobError, Result};
pub use input::{BacktestJobInput, DEFAULT_INITIAL_EQUITY};
pub use job::{BacktestJobRunner, JobIdentity, MAX_ERROR_MESSAGE_CHARS};
pub use observer::{AiProgressObserver, FnObserver, LoggingObserver, NoopObserver, ObserverError};
pub use overlay::{apply_overlay, overlaid};
pub use replay::{ReplayTrade, ReplayedBacktest};
pub use trigger::{handle_trigger, TriggerPayload};
