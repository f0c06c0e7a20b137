//! `replay` 명령어: 저장된 잡을 다시 계산해 검사용 결과 출력.
//!
//! ```bash
//! trader-bt replay bt-20240101 --chart-timeframe 1h --out replay.json
//! ```

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use tracing::{info, warn};
use trader_core::{RecordStore, Timeframe};

use super::{build_runner, load_strategy_config, record_store, write_output};
use crate::config::AppConfig;

/// `replay` 인자
#[derive(Debug, Clone)]
pub struct ReplayArgs {
    pub id: String,
    /// 차트 타임프레임 (없으면 실행 타임프레임)
    pub chart_timeframe: Option<Timeframe>,
    pub strategy_config: Option<PathBuf>,
    pub out: Option<PathBuf>,
}

pub async fn execute(config: &AppConfig, args: ReplayArgs) -> Result<()> {
    let record = record_store(config)
        .get(&args.id)
        .await?
        .ok_or_else(|| anyhow!("백테스트 레코드를 찾을 수 없습니다: {}", args.id))?;

    if !record.is_terminal() {
        warn!(job_id = %record.id, "아직 실행 중인 잡을 리플레이합니다");
    }

    let runner = build_runner(config, load_strategy_config(args.strategy_config.as_deref())?)?;
    let chart = args.chart_timeframe.unwrap_or(record.execution_timeframe);
    let replayed = runner.replay(&record, chart).await;

    info!(
        job_id = %record.id,
        trades = replayed.trades.len(),
        chart_candles = replayed.chart_candles.len(),
        warnings = replayed.warnings.len(),
        "리플레이 완료"
    );
    write_output(&replayed, args.out.as_ref())
}
