//! LLM 기반 레인지 검증.
//!
//! - [`planner`]: 평가 시점 계획 (호출 상한 준수)
//! - [`escalation`]: primary → fallback 2-모델 에스컬레이션
//! - [`prompt`] / [`parse`]: 프롬프트 구성과 방어적 응답 파싱
//! - [`client`]: `CompletionService` trait과 OpenRouter 구현

pub mod client;
pub mod error;
pub mod escalation;
pub mod parse;
pub mod planner;
pub mod prompt;

pub use client::{CompletionRequest, CompletionService, OpenRouterClient, OpenRouterConfig};
pub use error::{AiError, Result};
pub use escalation::{escalated_budget, EscalationPolicy, EvaluationOutcome, RangeValidator};
pub use planner::{plan, window_bounds, EvaluationPlan};
