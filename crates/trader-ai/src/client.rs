//! LLM 완성(completion) 서비스 추상화와 OpenRouter 구현.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::{AiError, Result};

// ============================================================================
// CompletionService trait
// ============================================================================

/// 완성 요청.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub model: String,
    pub system_prompt: String,
    pub user_payload: String,
    pub max_output_tokens: u32,
    pub temperature: f64,
    pub timeout: Duration,
}

/// LLM 완성 서비스.
///
/// 응답 텍스트를 그대로 반환하며, 해석은 호출자 책임입니다.
/// 타임아웃은 전송 실패로 취급됩니다.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    /// 서비스 이름 (로깅용).
    fn service_name(&self) -> &str {
        "completion"
    }
}

// ============================================================================
// OpenRouter 설정
// ============================================================================

/// 기본 OpenRouter API 주소.
pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

#[derive(Clone)]
pub struct OpenRouterConfig {
    pub api_key: SecretString,
    pub base_url: String,
    /// 전송 계층 타임아웃 (요청별 타임아웃과 별개)
    pub timeout: Duration,
    pub http_referer: Option<String>,
    pub app_title: Option<String>,
}

impl std::fmt::Debug for OpenRouterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterConfig")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("http_referer", &self.http_referer)
            .field("app_title", &self.app_title)
            .finish()
    }
}

impl OpenRouterConfig {
    /// API 키로 기본 설정 생성.
    ///
    /// # Errors
    ///
    /// 키가 비어 있으면 `AiError::Configuration`.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key: String = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AiError::Configuration("OpenRouter API 키가 비어 있습니다".to_string()));
        }
        Ok(Self {
            api_key: SecretString::from(api_key.trim().to_string()),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            http_referer: None,
            app_title: None,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `HTTP-Referer` / `X-Title` 헤더 값 (빈 문자열은 무시).
    pub fn with_attribution(mut self, referer: Option<String>, title: Option<String>) -> Self {
        self.http_referer = referer.filter(|s| !s.trim().is_empty());
        self.app_title = title.filter(|s| !s.trim().is_empty());
        self
    }
}

// ============================================================================
// OpenRouter 클라이언트
// ============================================================================

/// OpenRouter chat completions 클라이언트.
pub struct OpenRouterClient {
    http: Client,
    config: OpenRouterConfig,
}

impl OpenRouterClient {
    /// # Errors
    ///
    /// HTTP 클라이언트 생성 실패 시 `AiError::Configuration`.
    pub fn new(config: OpenRouterConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| AiError::Configuration(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl CompletionService for OpenRouterClient {
    #[instrument(skip(self, request), fields(model = %request.model, max_tokens = request.max_output_tokens))]
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = ChatCompletionRequest {
            model: &request.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_payload,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_output_tokens,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let mut http_req = self
            .http
            .post(self.endpoint())
            .timeout(request.timeout)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.config.api_key.expose_secret()),
            );
        if let Some(referer) = &self.config.http_referer {
            http_req = http_req.header("HTTP-Referer", referer);
        }
        if let Some(title) = &self.config.app_title {
            http_req = http_req.header("X-Title", title);
        }

        let resp = http_req.json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                AiError::Timeout(request.timeout)
            } else {
                AiError::Transport(e.to_string())
            }
        })?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| AiError::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(AiError::Api {
                status: status.as_u16(),
                body: text.chars().take(800).collect(),
            });
        }

        let parsed: ChatCompletionResponse =
            serde_json::from_str(&text).map_err(|e| AiError::Parse(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AiError::Parse("빈 응답".to_string()))?;

        debug!(chars = content.len(), "LLM 응답 수신");
        Ok(content)
    }

    fn service_name(&self) -> &str {
        "openrouter"
    }
}

// ============================================================================
// 와이어 타입
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f64,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessageOut>,
}

#[derive(Debug, Deserialize)]
struct ChatMessageOut {
    content: Option<String>,
}
