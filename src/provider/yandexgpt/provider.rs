use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::LLMError;
use crate::http::{DynHttpTransport, HttpRequest, send_with_retries, stream_with_retries};
use crate::provider::{LLMProvider, ResponseStream};
use crate::retry::RetryPolicy;
use crate::types::Message;

use super::error::convert_status_error;
use super::request::build_completion_payload;
use super::stream::partial_response_stream;
use super::types::CompletionResponse;

/// 固定的公开 completion 端点
pub const DEFAULT_URL: &str = "https://llm.api.cloud.yandex.net/foundationModels/v1/completion";

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

fn default_model_version() -> String {
    "latest".to_string()
}

fn default_max_tokens() -> u32 {
    7400
}

fn default_temperature() -> f32 {
    0.2
}

/// YandexGPT 风格后端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YandexGptConfig {
    #[serde(default = "default_url")]
    pub url: String,
    /// 原样作为 `Authorization` 头发送 例如 `Api-Key ...` 或 `Bearer ...`
    #[serde(default)]
    pub auth_header: Option<String>,
    /// 模型 URI 中的 folder 标识
    pub folder_id: String,
    pub model_name: String,
    #[serde(default = "default_model_version")]
    pub model_version: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// 原样并入请求体的附加字段
    #[serde(default)]
    pub request_extra: HashMap<String, Value>,
}

/// YandexGPT Completion Provider
pub struct YandexGptProvider {
    config: YandexGptConfig,
    transport: DynHttpTransport,
    retry: RetryPolicy,
}

impl YandexGptProvider {
    /// 创建使用默认重试策略的 Provider
    pub fn new(config: YandexGptConfig, transport: DynHttpTransport) -> Self {
        Self {
            config,
            transport,
            retry: RetryPolicy::default(),
        }
    }

    /// 自定义重试策略
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn build_headers(&self) -> HashMap<String, String> {
        let mut headers = HashMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());
        headers.insert(
            "x-data-logging-enabled".to_string(),
            "false".to_string(),
        );
        if let Some(auth_header) = &self.config.auth_header {
            headers.insert("Authorization".to_string(), auth_header.clone());
        }
        headers
    }

    /// 显式可选温度 在调用开始时就解析为具体值
    fn resolve_temperature(&self, temperature: Option<f32>) -> f32 {
        temperature.unwrap_or(self.config.temperature)
    }

    fn serialize_payload(&self, payload: &Value) -> Result<Vec<u8>, LLMError> {
        serde_json::to_vec(payload)
            .map_err(|err| LLMError::validation(format!("failed to serialize request: {err}")))
    }

    fn build_request(&self, payload: &[u8]) -> HttpRequest {
        HttpRequest::post_json(self.config.url.clone(), payload.to_vec())
            .with_headers(self.build_headers())
    }
}

#[async_trait]
impl LLMProvider for YandexGptProvider {
    async fn request_response(
        &self,
        messages: Vec<Message>,
        temperature: Option<f32>,
    ) -> Result<String, LLMError> {
        let temperature = self.resolve_temperature(temperature);
        let payload = build_completion_payload(&self.config, &messages, temperature, false)?;
        let payload = self.serialize_payload(&payload)?;

        debug!(model = %self.config.model_name, "requesting completion");
        let body = send_with_retries(self.transport.as_ref(), &self.retry, || {
            Ok(self.build_request(&payload))
        })
        .await
        .map_err(convert_status_error)?;

        let parsed: CompletionResponse = serde_json::from_slice(&body)
            .map_err(|err| LLMError::validation(format!("failed to parse response: {err}")))?;
        let alternative = parsed
            .result
            .alternatives
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::validation("response carries no alternatives"))?;
        Ok(alternative.message.text)
    }

    async fn stream_response(
        &self,
        messages: Vec<Message>,
        temperature: Option<f32>,
    ) -> Result<ResponseStream, LLMError> {
        let temperature = self.resolve_temperature(temperature);
        let payload = build_completion_payload(&self.config, &messages, temperature, true)?;
        let payload = self.serialize_payload(&payload)?;

        debug!(model = %self.config.model_name, "starting completion stream");
        let response = stream_with_retries(self.transport.as_ref(), &self.retry, || {
            Ok(self.build_request(&payload))
        })
        .await
        .map_err(convert_status_error)?;

        Ok(partial_response_stream(response.body))
    }

    fn name(&self) -> &'static str {
        "yandexgpt"
    }
}
