//! CLI 명령어 구현.

pub mod replay;
pub mod run;
pub mod show;
pub mod trigger;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use trader_ai::{OpenRouterClient, OpenRouterConfig};
use trader_backtest::{BacktestJobInput, BacktestJobRunner, JobContext};
use trader_data::{
    BinanceKlineConfig, BinanceKlineProvider, FsBlobStore, FsRecordStore, ResolverConfig,
};
use trader_strategy::{RangeReversionConfig, RangeReversionEngine};

use crate::config::AppConfig;

/// 잡 정의 파일 (TOML 또는 JSON).
///
/// 잡 입력 필드는 최상위에, 엔진 설정은 선택적 `strategy` 테이블에 둡니다.
#[derive(Debug, Clone, Deserialize)]
pub struct JobFile {
    #[serde(flatten)]
    pub input: BacktestJobInput,
    #[serde(default)]
    pub strategy: RangeReversionConfig,
}

/// 파일 형식
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFormat {
    Toml,
    Json,
}

impl FileFormat {
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Json,
        }
    }
}

/// 확장자에 따라 TOML/JSON으로 읽기.
pub fn load_file<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("파일을 읽을 수 없습니다: {}", path.display()))?;
    match FileFormat::from_path(path) {
        FileFormat::Toml => toml::from_str(&text)
            .with_context(|| format!("TOML 파싱 실패: {}", path.display())),
        FileFormat::Json => serde_json::from_str(&text)
            .with_context(|| format!("JSON 파싱 실패: {}", path.display())),
    }
}

/// 엔진 설정 파일이 주어지면 읽고, 아니면 기본값.
pub fn load_strategy_config(path: Option<&Path>) -> Result<RangeReversionConfig> {
    match path {
        Some(path) => load_file(path),
        None => Ok(RangeReversionConfig::default()),
    }
}

/// 설정으로부터 잡 실행기 구성.
pub fn build_runner(config: &AppConfig, strategy: RangeReversionConfig) -> Result<BacktestJobRunner> {
    let provider = BinanceKlineProvider::new(BinanceKlineConfig {
        base_url: config.provider.base_url.clone(),
        timeout: config.provider.timeout(),
    })
    .map_err(|e| anyhow!("캔들 제공자 생성 실패: {e}"))?;

    let mut ctx = JobContext::new(
        Arc::new(FsBlobStore::new(&config.blob_dir)),
        Arc::new(record_store(config)),
        Arc::new(provider),
        Arc::new(RangeReversionEngine::new(strategy)),
    )
    .with_resolver_config(ResolverConfig {
        max_pages: config.provider.max_pages,
    });

    match &config.llm {
        Some(llm) => {
            let mut or_config = OpenRouterConfig::new(llm.api_key())?
                .with_timeout(llm.timeout())
                .with_attribution(llm.http_referer.clone(), llm.app_title.clone());
            if let Some(base_url) = &llm.base_url {
                or_config = or_config.with_base_url(base_url.clone());
            }
            ctx = ctx.with_completion(Arc::new(OpenRouterClient::new(or_config)?));
            info!("OpenRouter completion 서비스 사용");
        }
        None => warn!("OPENROUTER_API_KEY 없음, AI 검증이 켜진 잡은 실패합니다"),
    }

    Ok(BacktestJobRunner::new(ctx))
}

pub fn record_store(config: &AppConfig) -> FsRecordStore {
    FsRecordStore::new(&config.record_dir)
}

/// 결과를 JSON으로 출력 (파일 또는 stdout).
pub fn write_output<T: Serialize>(value: &T, out: Option<&PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("결과 저장 실패: {}", path.display()))?;
            info!(path = %path.display(), "결과 저장 완료");
        }
        None => println!("{json}"),
    }
    Ok(())
}
