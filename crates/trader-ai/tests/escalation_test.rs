//! 에스컬레이션 시나리오 테스트.

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use trader_ai::{
    escalation::PRIMARY_MAX_TOKENS, AiError, CompletionRequest, CompletionService,
    EscalationPolicy, EvaluationOutcome, RangeValidator,
};
use trader_core::{AiConfig, AiConfigInput, AiEvaluation, Candle, Timeframe, AI_VALIDATION_FAILED};

const PRIMARY: &str = "test/primary";
const FALLBACK: &str = "test/fallback";

/// 모델별로 미리 정해둔 응답을 차례대로 돌려주는 서비스.
#[derive(Default)]
struct ScriptedService {
    script: Mutex<HashMap<String, VecDeque<Result<String, AiError>>>>,
    calls: Mutex<Vec<(String, u32)>>,
}

impl ScriptedService {
    fn respond(self, model: &str, response: Result<String, AiError>) -> Self {
        self.script
            .lock()
            .unwrap()
            .entry(model.to_string())
            .or_default()
            .push_back(response);
        self
    }

    fn calls(&self) -> Vec<(String, u32)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedService {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, AiError> {
        self.calls
            .lock()
            .unwrap()
            .push((request.model.clone(), request.max_output_tokens));
        self.script
            .lock()
            .unwrap()
            .get_mut(&request.model)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(AiError::Transport("script exhausted".to_string())))
    }
}

/// 응답하지 않는 서비스.
struct HangingService;

#[async_trait]
impl CompletionService for HangingService {
    async fn complete(&self, _request: &CompletionRequest) -> Result<String, AiError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(String::new())
    }
}

fn verdict(is_ranging: bool, confidence: f64) -> Result<String, AiError> {
    Ok(format!(
        r#"{{"isRanging": {is_ranging}, "confidence": {confidence}, "range": {{"val": 99, "poc": 100, "vah": 101}}, "reasons": ["r"]}}"#
    ))
}

fn config() -> AiConfig {
    AiConfig::normalize(&AiConfigInput {
        enabled: Some(true),
        model_primary: Some(PRIMARY.to_string()),
        model_fallback: Some(FALLBACK.to_string()),
        ..Default::default()
    })
}

fn window(len: usize) -> Vec<Candle> {
    (0..len)
        .map(|i| {
            let wave = (i % 7) as f64;
            Candle::new(i as i64 * 900_000, 100.0 + wave, 102.0 + wave, 98.0 + wave, 100.5, 10.0)
        })
        .collect()
}

async fn evaluate(service: Arc<dyn CompletionService>, len: usize) -> EvaluationOutcome {
    RangeValidator::new(service)
        .evaluate("BTCUSDT", Timeframe::M15, &window(len), len.saturating_sub(1), &config())
        .await
}

fn evaluated(outcome: EvaluationOutcome) -> AiEvaluation {
    match outcome {
        EvaluationOutcome::Evaluated(e) => e,
        EvaluationOutcome::Skipped => panic!("expected evaluation"),
    }
}

#[tokio::test]
async fn confident_primary_is_accepted_without_fallback() {
    let service = Arc::new(ScriptedService::default().respond(PRIMARY, verdict(true, 0.9)));
    let e = evaluated(evaluate(service.clone(), 120).await);

    assert!(e.accepted);
    assert!(!e.used_fallback);
    assert_eq!(e.final_model, PRIMARY);
    assert_eq!(e.at_index, 119);
    assert_eq!(e.at_time, 119 * 900_000);
    assert_eq!(service.calls(), vec![(PRIMARY.to_string(), PRIMARY_MAX_TOKENS)]);
}

#[tokio::test]
async fn low_confidence_primary_escalates_to_fallback() {
    let service = Arc::new(
        ScriptedService::default()
            .respond(PRIMARY, verdict(true, 0.50))
            .respond(FALLBACK, verdict(true, 0.80)),
    );
    let e = evaluated(evaluate(service.clone(), 120).await);

    assert!(e.used_fallback);
    assert!(e.accepted);
    assert_eq!(e.final_model, FALLBACK);
    assert_eq!(e.confidence, 0.80);
    assert_eq!(
        service.calls(),
        vec![(PRIMARY.to_string(), 700), (FALLBACK.to_string(), 1400)]
    );
}

#[tokio::test]
async fn weaker_fallback_keeps_primary() {
    let service = Arc::new(
        ScriptedService::default()
            .respond(PRIMARY, verdict(true, 0.60))
            .respond(FALLBACK, verdict(false, 0.40)),
    );
    let e = evaluated(evaluate(service, 120).await);

    assert_eq!(e.final_model, PRIMARY);
    assert!(!e.used_fallback);
    assert!(!e.accepted);
    assert_eq!(e.confidence, 0.60);
}

#[tokio::test]
async fn primary_parse_failure_retries_with_escalated_budget() {
    let service = Arc::new(
        ScriptedService::default()
            .respond(PRIMARY, Ok("not json".to_string()))
            .respond(PRIMARY, verdict(true, 0.95)),
    );
    let e = evaluated(evaluate(service.clone(), 120).await);

    assert_eq!(e.final_model, PRIMARY);
    assert!(e.accepted);
    assert_eq!(
        service.calls(),
        vec![(PRIMARY.to_string(), 700), (PRIMARY.to_string(), 1400)]
    );
}

#[tokio::test]
async fn both_models_failing_yields_failed_evaluation() {
    let service = Arc::new(
        ScriptedService::default()
            .respond(PRIMARY, Err(AiError::Transport("boom".to_string())))
            .respond(PRIMARY, Err(AiError::Api { status: 500, body: "err".to_string() }))
            .respond(FALLBACK, Ok("garbage".to_string())),
    );
    let e = evaluated(evaluate(service.clone(), 120).await);

    assert!(!e.accepted);
    assert!(!e.is_ranging);
    assert_eq!(e.confidence, 0.0);
    assert!(e.used_fallback);
    assert_eq!(e.final_model, FALLBACK);
    assert_eq!(e.reasons, vec![AI_VALIDATION_FAILED.to_string()]);
    assert!(e.error_message.is_some());
    assert!(e.range.val <= e.range.poc && e.range.poc <= e.range.vah);
    assert_eq!(service.calls().len(), 3);
}

#[tokio::test]
async fn short_window_is_skipped() {
    let service = Arc::new(ScriptedService::default());
    assert_eq!(evaluate(service.clone(), 59).await, EvaluationOutcome::Skipped);
    assert!(service.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn hung_calls_time_out_as_transport_failures() {
    let validator = RangeValidator::new(Arc::new(HangingService)).with_policy(EscalationPolicy {
        call_timeout: Duration::from_secs(1),
        ..Default::default()
    });
    let outcome = validator
        .evaluate("BTCUSDT", Timeframe::M15, &window(80), 79, &config())
        .await;
    let e = evaluated(outcome);
    assert!(!e.accepted);
    assert!(e.error_message.unwrap().contains("타임아웃"));
}
