//! 레인지 검증 백테스트 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # 잡 정의 파일로 백테스트 실행
//! trader-bt run jobs/btc-range.toml
//!
//! # 이벤트 트리거 페이로드 처리 (중복 전달 시 같은 레코드 재사용)
//! trader-bt trigger payload.json
//!
//! # 저장된 잡 리플레이 (1시간봉 차트)
//! trader-bt replay bt-20240101 --chart-timeframe 1h
//!
//! # 저장된 레코드 보기
//! trader-bt show bt-20240101
//! ```
//!
//! 설정은 환경변수(`.env` 포함)에서 읽습니다. [`config::AppConfig`] 참고.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use trader_core::Timeframe;

mod commands;
mod config;

use commands::{replay::ReplayArgs, run::RunArgs, trigger::TriggerArgs};
use config::AppConfig;

#[derive(Parser)]
#[command(name = "trader-bt")]
#[command(about = "AI 레인지 검증 백테스트 실행기", long_about = None)]
#[command(version)]
struct Cli {
    /// 로그 레벨 (RUST_LOG가 있으면 무시)
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// 로그 형식 (text, json)
    #[arg(long, env = "LOG_FORMAT", default_value = "text", global = true)]
    log_format: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 잡 정의 파일(TOML/JSON)로 백테스트 실행
    Run {
        /// 잡 정의 파일
        job_file: PathBuf,

        /// 잡 식별자 (중복 실행 방지용)
        #[arg(long)]
        id: Option<String>,

        /// 결과 레코드 저장 경로 (지정하지 않으면 stdout)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// 트리거 페이로드 처리 (`{"backtestId"?, "input"}`)
    Trigger {
        /// 페이로드 파일 (`-`이면 stdin)
        payload: PathBuf,

        /// 엔진 설정 파일 (TOML/JSON)
        #[arg(long)]
        strategy_config: Option<PathBuf>,

        /// 결과 레코드 저장 경로
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// 저장된 잡 리플레이
    Replay {
        /// 백테스트 ID
        id: String,

        /// 차트 타임프레임 (기본: 실행 타임프레임)
        #[arg(short, long)]
        chart_timeframe: Option<Timeframe>,

        /// 엔진 설정 파일 (TOML/JSON)
        #[arg(long)]
        strategy_config: Option<PathBuf>,

        /// 결과 저장 경로
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// 저장된 잡 레코드 출력
    Show {
        /// 백테스트 ID
        id: String,
    },
}

fn init_tracing(level: &str, format: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "trader_cli={level},trader_backtest={level},trader_data={level},trader_ai={level},trader_strategy={level}"
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if format.eq_ignore_ascii_case("json") {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일 로드 (없어도 에러 안남)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(&cli.log_level, &cli.log_format);

    let config = AppConfig::from_env();
    tracing::debug!(?config, "설정 로드 완료");

    match cli.command {
        Commands::Run { job_file, id, out } => {
            commands::run::execute(&config, RunArgs { job_file, id, out }).await
        }
        Commands::Trigger {
            payload,
            strategy_config,
            out,
        } => {
            commands::trigger::execute(
                &config,
                TriggerArgs {
                    payload,
                    strategy_config,
                    out,
                },
            )
            .await
        }
        Commands::Replay {
            id,
            chart_timeframe,
            strategy_config,
            out,
        } => {
            commands::replay::execute(
                &config,
                ReplayArgs {
                    id,
                    chart_timeframe,
                    strategy_config,
                    out,
                },
            )
            .await
        }
        Commands::Show { id } => commands::show::execute(&config, &id).await,
    }
}
