//! 환경변수 기반 설정 모듈.

use std::{path::PathBuf, time::Duration};

use secrecy::{ExposeSecret, SecretString};
use trader_data::cache::resolver::DEFAULT_MAX_PAGES;

/// CLI 전체 설정
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// 캔들 캐시 블롭 루트
    pub blob_dir: PathBuf,
    /// 잡 레코드 루트
    pub record_dir: PathBuf,
    /// 캔들 제공자 설정
    pub provider: ProviderConfig,
    /// LLM 설정 (API 키가 없으면 `None`)
    pub llm: Option<LlmConfig>,
}

/// 캔들 제공자 설정
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    /// 업스트림 페이지 최대 수
    pub max_pages: usize,
}

/// OpenRouter 설정
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: SecretString,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub http_referer: Option<String>,
    pub app_title: Option<String>,
}

impl AppConfig {
    /// 환경변수에서 설정 로드 (`.env` 포함)
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let llm = env_var_opt("OPENROUTER_API_KEY").map(|key| LlmConfig {
            api_key: SecretString::from(key),
            base_url: env_var_opt("OPENROUTER_BASE_URL"),
            timeout_secs: env_var_parse("LLM_TIMEOUT_SECS", 30),
            http_referer: env_var_opt("OPENROUTER_HTTP_REFERER"),
            app_title: env_var_opt("OPENROUTER_APP_TITLE"),
        });

        Self {
            blob_dir: env_var_parse("BLOB_DIR", PathBuf::from("data/blobs")),
            record_dir: env_var_parse("RECORD_DIR", PathBuf::from("data/records")),
            provider: ProviderConfig {
                base_url: env_var_opt("BINANCE_BASE_URL")
                    .unwrap_or_else(|| trader_data::provider::binance::DEFAULT_BASE_URL.to_string()),
                timeout_secs: env_var_parse("PROVIDER_TIMEOUT_SECS", 15),
                max_pages: env_var_parse("PROVIDER_MAX_PAGES", DEFAULT_MAX_PAGES),
            },
            llm,
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// 비어 있지 않은 환경변수 값
fn env_var_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    // 다른 테스트와 겹치지 않는 키만 사용
    #[test]
    fn parse_falls_back_on_missing_or_invalid_values() {
        std::env::set_var("TRADER_BT_TEST_PAGES", "not-a-number");
        assert_eq!(env_var_parse("TRADER_BT_TEST_PAGES", 7usize), 7);

        std::env::set_var("TRADER_BT_TEST_PAGES", " 12 ");
        assert_eq!(env_var_parse("TRADER_BT_TEST_PAGES", 7usize), 12);

        assert_eq!(env_var_parse("TRADER_BT_TEST_UNSET", 3u64), 3);
    }

    #[test]
    fn blank_values_are_treated_as_unset() {
        std::env::set_var("TRADER_BT_TEST_BLANK", "   ");
        assert_eq!(env_var_opt("TRADER_BT_TEST_BLANK"), None);
        std::env::set_var("TRADER_BT_TEST_SET", " value ");
        assert_eq!(env_var_opt("TRADER_BT_TEST_SET").as_deref(), Some("value"));
    }
}
