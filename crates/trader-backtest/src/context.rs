//! 잡 실행 협력자 묶음.
//!
//! 프로세스 전역 싱글톤은 없습니다. 저장소, 제공자, completion 서비스,
//! 전략 엔진은 모두 호출자가 소유하고 여기로 전달합니다.

use std::sync::Arc;

use trader_ai::{CompletionService, EscalationPolicy};
use trader_core::{BlobStore, CandleProvider, RecordStore, StrategyEngine};
use trader_data::ResolverConfig;

/// 잡 실행 컨텍스트.
#[derive(Clone)]
pub struct JobContext {
    pub blobs: Arc<dyn BlobStore>,
    pub records: Arc<dyn RecordStore>,
    pub provider: Arc<dyn CandleProvider>,
    pub engine: Arc<dyn StrategyEngine>,
    /// AI 비활성 잡만 실행한다면 `None`이어도 됩니다.
    pub completion: Option<Arc<dyn CompletionService>>,
    pub resolver: ResolverConfig,
    pub escalation: EscalationPolicy,
}

impl JobContext {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        records: Arc<dyn RecordStore>,
        provider: Arc<dyn CandleProvider>,
        engine: Arc<dyn StrategyEngine>,
    ) -> Self {
        Self {
            blobs,
            records,
            provider,
            engine,
            completion: None,
            resolver: ResolverConfig::default(),
            escalation: EscalationPolicy::default(),
        }
    }

    pub fn with_completion(mut self, completion: Arc<dyn CompletionService>) -> Self {
        self.completion = Some(completion);
        self
    }

    pub fn with_resolver_config(mut self, config: ResolverConfig) -> Self {
        self.resolver = config;
        self
    }

    pub fn with_escalation_policy(mut self, policy: EscalationPolicy) -> Self {
        self.escalation = policy;
        self
    }
}
