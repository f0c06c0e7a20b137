//! `trigger` 명령어: 이벤트 트리거 페이로드 처리.
//!
//! ```bash
//! trader-bt trigger payload.json
//! cat payload.json | trader-bt trigger -
//! ```

use std::{
    io::Read,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use trader_backtest::{handle_trigger, LoggingObserver};

use super::{build_runner, load_strategy_config, write_output};
use crate::config::AppConfig;

/// `trigger` 인자
#[derive(Debug, Clone)]
pub struct TriggerArgs {
    /// 페이로드 파일 (`-`이면 stdin)
    pub payload: PathBuf,
    pub strategy_config: Option<PathBuf>,
    pub out: Option<PathBuf>,
}

pub async fn execute(config: &AppConfig, args: TriggerArgs) -> Result<()> {
    let payload = read_payload(&args.payload)?;
    let runner = build_runner(config, load_strategy_config(args.strategy_config.as_deref())?)?;

    let observer = LoggingObserver::with_label("trigger");
    let record = handle_trigger(&runner, &payload, Some(&observer)).await?;
    write_output(&record, args.out.as_ref())
}

fn read_payload(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("stdin 읽기 실패")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("페이로드 파일을 읽을 수 없습니다: {}", path.display()))
}
