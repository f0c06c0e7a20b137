//! Binance 공개 klines REST 제공자.
//!
//! `GET {base}/api/v3/klines?symbol&interval&startTime&endTime&limit=1000`
//!
//! 응답 행은 `[openTime, "open", "high", "low", "close", "volume", closeTime, ...]`
//! 형식의 원본 배열 그대로 반환하며, 해석은 [`crate::normalize`]가 담당합니다.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, instrument};
use trader_core::{CandleProvider, ProviderError, Timeframe};

// ============================================================================
// 설정
// ============================================================================

/// 기본 REST 엔드포인트.
pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";
/// 요청당 최대 행 수.
pub const PAGE_LIMIT: u32 = 1000;
/// 기본 요청 타임아웃.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct BinanceKlineConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for BinanceKlineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

// ============================================================================
// Provider
// ============================================================================

/// Binance klines 제공자.
pub struct BinanceKlineProvider {
    http: Client,
    base_url: String,
}

impl BinanceKlineProvider {
    /// 새 제공자 생성.
    ///
    /// # Errors
    ///
    /// HTTP 클라이언트 생성 실패 시 `ProviderError::Network`.
    pub fn new(config: BinanceKlineConfig) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// 거래소 심볼 형식으로 변환 (`btc/usdt` → `BTCUSDT`).
    pub fn exchange_symbol(symbol: &str) -> String {
        symbol
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_uppercase()
    }
}

#[async_trait]
impl CandleProvider for BinanceKlineProvider {
    #[instrument(skip(self), fields(provider = "binance"))]
    async fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from_ms: i64,
        to_ms: i64,
    ) -> Result<Vec<Value>, ProviderError> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let query = [
            ("symbol", Self::exchange_symbol(symbol)),
            ("interval", timeframe.as_str().to_string()),
            ("startTime", from_ms.to_string()),
            ("endTime", to_ms.to_string()),
            ("limit", PAGE_LIMIT.to_string()),
        ];

        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api(format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let rows: Vec<Value> = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;
        debug!(rows = rows.len(), "Binance klines 수신");
        Ok(rows)
    }

    fn provider_name(&self) -> &str {
        "binance"
    }
}
