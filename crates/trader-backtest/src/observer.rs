//! AI 진행 상황 옵저버.
//!
//! 옵저버 에러는 로그만 남기고 무시됩니다. 잡을 실패시키지 않습니다.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;
use trader_core::AiSummary;

/// 옵저버 에러.
#[derive(Debug, Clone, Error)]
#[error("진행 상황 전달 실패: {0}")]
pub struct ObserverError(pub String);

/// AI 진행 상황 수신자.
///
/// 계획 직후, 평가 시점마다(성공/실패 무관), 완료 시 한 번 더 호출됩니다.
#[async_trait]
pub trait AiProgressObserver: Send + Sync {
    async fn on_progress(&self, summary: &AiSummary) -> Result<(), ObserverError>;
}

/// 아무것도 하지 않는 옵저버.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

#[async_trait]
impl AiProgressObserver for NoopObserver {
    async fn on_progress(&self, _summary: &AiSummary) -> Result<(), ObserverError> {
        Ok(())
    }
}

/// 클로저 어댑터.
pub struct FnObserver<F>(F);

impl<F> FnObserver<F>
where
    F: Fn(&AiSummary) -> Result<(), ObserverError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

#[async_trait]
impl<F> AiProgressObserver for FnObserver<F>
where
    F: Fn(&AiSummary) -> Result<(), ObserverError> + Send + Sync,
{
    async fn on_progress(&self, summary: &AiSummary) -> Result<(), ObserverError> {
        (self.0)(summary)
    }
}

/// 진행 상황을 `info!` 로그로 남기는 옵저버.
#[derive(Debug, Default, Clone)]
pub struct LoggingObserver {
    label: Option<String>,
}

impl LoggingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
        }
    }
}

#[async_trait]
impl AiProgressObserver for LoggingObserver {
    async fn on_progress(&self, summary: &AiSummary) -> Result<(), ObserverError> {
        info!(
            label = self.label.as_deref().unwrap_or("-"),
            planned = summary.planned_evaluations,
            run = summary.evaluations_run,
            accepted = summary.evaluations_accepted,
            fallback = summary.fallback_used,
            failed = summary.failed,
            "AI 검증 진행"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use trader_core::AiConfig;

    #[tokio::test]
    async fn fn_observer_forwards_calls() {
        let seen = AtomicUsize::new(0);
        let observer = FnObserver::new(|s: &AiSummary| {
            seen.fetch_add(s.planned_evaluations, Ordering::SeqCst);
            Ok(())
        });
        let summary = AiSummary::planned(AiConfig::default(), 12, 3);
        observer.on_progress(&summary).await.unwrap();
        observer.on_progress(&summary).await.unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 6);

        assert!(NoopObserver.on_progress(&summary).await.is_ok());
        assert!(LoggingObserver::with_label("t").on_progress(&summary).await.is_ok());
    }
}
