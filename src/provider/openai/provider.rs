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
use super::request::build_completions_payload;
use super::stream::partial_response_stream;
use super::types::ChatCompletionsResponse;

fn default_temperature() -> f32 {
    0.2
}

/// OpenAI 兼容后端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// Chat Completions 端点完整 URL
    pub url: String,
    /// 配置后以 `Authorization: Bearer <token>` 发送
    #[serde(default)]
    pub auth_token: Option<String>,
    pub model_name: String,
    /// Gemma 2 等部署不接受 system 角色且要求严格交替时开启
    #[serde(default)]
    pub force_user_assistant_message_alternation: bool,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// 原样并入请求体的附加字段 例如 max_tokens
    #[serde(default)]
    pub request_extra: HashMap<String, Value>,
}

/// OpenAI Chat Completions Provider
pub struct OpenAiProvider {
    config: OpenAiConfig,
    transport: DynHttpTransport,
    retry: RetryPolicy,
}

impl OpenAiProvider {
    /// 创建使用默认重试策略的 Provider
    pub fn new(config: OpenAiConfig, transport: DynHttpTransport) -> Self {
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
        if let Some(token) = &self.config.auth_token {
            headers.insert("Authorization".to_string(), format!("Bearer {token}"));
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
impl LLMProvider for OpenAiProvider {
    async fn request_response(
        &self,
        messages: Vec<Message>,
        temperature: Option<f32>,
    ) -> Result<String, LLMError> {
        let temperature = self.resolve_temperature(temperature);
        let payload =
            build_completions_payload(&self.config, &messages, temperature, false)?;
        let payload = self.serialize_payload(&payload)?;

        debug!(model = %self.config.model_name, "requesting chat completion");
        let body = send_with_retries(self.transport.as_ref(), &self.retry, || {
            Ok(self.build_request(&payload))
        })
        .await
        .map_err(convert_status_error)?;

        let parsed: ChatCompletionsResponse = serde_json::from_slice(&body)
            .map_err(|err| LLMError::validation(format!("failed to parse response: {err}")))?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LLMError::validation("response carries no choices"))?;
        Ok(choice.message.content)
    }

    async fn stream_response(
        &self,
        messages: Vec<Message>,
        temperature: Option<f32>,
    ) -> Result<ResponseStream, LLMError> {
        let temperature = self.resolve_temperature(temperature);
        let payload = build_completions_payload(&self.config, &messages, temperature, true)?;
        let payload = self.serialize_payload(&payload)?;

        debug!(model = %self.config.model_name, "starting chat completion stream");
        let response = stream_with_retries(self.transport.as_ref(), &self.retry, || {
            Ok(self.build_request(&payload))
        })
        .await
        .map_err(convert_status_error)?;

        Ok(partial_response_stream(response.body))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
