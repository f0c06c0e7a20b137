//! `show` 명령어: 저장된 잡 레코드 출력.

use anyhow::{anyhow, Result};
use trader_core::RecordStore;

use super::{record_store, write_output};
use crate::config::AppConfig;

pub async fn execute(config: &AppConfig, id: &str) -> Result<()> {
    let record = record_store(config)
        .get(id)
        .await?
        .ok_or_else(|| anyhow!("백테스트 레코드를 찾을 수 없습니다: {id}"))?;
    write_output(&record, None)
}
