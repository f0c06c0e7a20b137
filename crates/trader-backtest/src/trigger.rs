//! 이벤트 트리거 페이로드 처리.
//!
//! 페이로드 형식: `{"backtestId"?: string, "input": BacktestJobInput}`
//!
//! 잘못된 페이로드는 레코드를 만들지 않고 [`JobError::Validation`]으로 반환됩니다.
//! 참조된 `backtestId`의 레코드가 `running`이면 `failed`로 정리합니다.

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, warn};
use trader_core::{BacktestRecord, BacktestStatus};

use crate::{
    error::{JobError, Result},
    input::BacktestJobInput,
    job::{mark_failed, BacktestJobRunner, JobIdentity},
    observer::AiProgressObserver,
};

/// 트리거 페이로드.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerPayload {
    #[serde(default)]
    pub backtest_id: Option<String>,
    pub input: BacktestJobInput,
}

/// 트리거 페이로드를 검증하고 잡을 실행합니다.
pub async fn handle_trigger(
    runner: &BacktestJobRunner,
    payload: &str,
    observer: Option<&dyn AiProgressObserver>,
) -> Result<BacktestRecord> {
    let raw: Value = serde_json::from_str(payload)
        .map_err(|e| JobError::Validation(format!("트리거 페이로드 JSON 파싱 실패: {e}")))?;

    let backtest_id = raw
        .get("backtestId")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string);

    let parsed = serde_json::from_value::<TriggerPayload>(raw)
        .map_err(|e| JobError::Validation(format!("트리거 페이로드 형식 오류: {e}")))
        .and_then(|p| p.input.validated());

    let input = match parsed {
        Ok(input) => input,
        Err(err) => {
            warn!(
                backtest_id = backtest_id.as_deref().unwrap_or("-"),
                error = %err,
                "트리거 페이로드 거부"
            );
            if let Some(id) = &backtest_id {
                fail_running_record(runner, id, &err).await;
            }
            return Err(err);
        }
    };

    info!(
        backtest_id = backtest_id.as_deref().unwrap_or("-"),
        symbol = %input.symbol,
        "트리거 수신"
    );
    Ok(runner
        .run(input, backtest_id.map(JobIdentity::new), observer)
        .await)
}

/// 참조된 running 레코드를 failed로 정리 (best-effort).
async fn fail_running_record(runner: &BacktestJobRunner, id: &str, err: &JobError) {
    let records = &runner.context().records;
    let mut record = match records.get(id).await {
        Ok(Some(record)) if record.status == BacktestStatus::Running => record,
        Ok(_) => return,
        Err(e) => {
            warn!(job_id = id, error = %e, "정리 대상 레코드 조회 실패");
            return;
        }
    };

    mark_failed(&mut record, &err.to_string());
    if let Err(e) = records.put(&record).await {
        warn!(job_id = id, error = %e, "running 레코드 정리 실패");
    }
}
