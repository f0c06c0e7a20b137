//! `run` 명령어: 잡 정의 파일로 백테스트 실행.
//!
//! ```bash
//! trader-bt run jobs/btc-range.toml
//! trader-bt run jobs/btc-range.toml --id bt-20240101 --out result.json
//! ```

use std::path::PathBuf;

use anyhow::{bail, Result};
use tracing::info;
use trader_backtest::{JobIdentity, LoggingObserver};
use trader_core::BacktestStatus;

use super::{build_runner, load_file, write_output, JobFile};
use crate::config::AppConfig;

/// `run` 인자
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub job_file: PathBuf,
    pub id: Option<String>,
    pub out: Option<PathBuf>,
}

pub async fn execute(config: &AppConfig, args: RunArgs) -> Result<()> {
    let job: JobFile = load_file(&args.job_file)?;
    let runner = build_runner(config, job.strategy)?;

    let observer = LoggingObserver::with_label(args.job_file.display().to_string());
    let record = runner
        .run(job.input, args.id.map(JobIdentity::new), Some(&observer))
        .await;

    info!(
        job_id = %record.id,
        status = record.status.as_str(),
        trades = record.metrics.total_trades,
        net_pnl = record.metrics.net_pnl,
        "백테스트 종료"
    );
    write_output(&record, args.out.as_ref())?;

    if record.status == BacktestStatus::Failed {
        bail!(
            "백테스트 실패: {}",
            record.error_message.as_deref().unwrap_or("알 수 없는 에러")
        );
    }
    Ok(())
}
