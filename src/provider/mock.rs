use async_trait::async_trait;
use futures_util::stream;
use serde::{Deserialize, Serialize};

use crate::error::LLMError;
use crate::provider::{LLMProvider, ResponseStream};
use crate::types::Message;

/// Mock 后端配置 直接给出固定输出
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockConfig {
    /// `request_response` 返回的固定文本
    pub response_message: String,
    /// `stream_response` 依次重放的文本快照
    #[serde(default)]
    pub stream_messages: Vec<String>,
}

/// In-memory provider used to test caller integration without network calls.
///
/// Ignores messages and temperature entirely and never fails, so callers can
/// exercise their own plumbing deterministically.
pub struct MockProvider {
    config: MockConfig,
}

impl MockProvider {
    /// 创建 Mock Provider
    pub fn new(config: MockConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl LLMProvider for MockProvider {
    async fn request_response(
        &self,
        _messages: Vec<Message>,
        _temperature: Option<f32>,
    ) -> Result<String, LLMError> {
        Ok(self.config.response_message.clone())
    }

    async fn stream_response(
        &self,
        _messages: Vec<Message>,
        _temperature: Option<f32>,
    ) -> Result<ResponseStream, LLMError> {
        let replayed = self.config.stream_messages.clone();
        Ok(Box::pin(stream::iter(replayed.into_iter().map(Ok))))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
