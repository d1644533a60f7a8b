use serde::{Deserialize, Serialize};

use crate::types::MessageRole;

/// Completion 请求报文
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CompletionRequest {
    #[serde(rename = "modelUri")]
    pub(crate) model_uri: String,
    #[serde(rename = "completionOptions")]
    pub(crate) completion_options: CompletionOptions,
    pub(crate) messages: Vec<CompletionMessage>,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct CompletionOptions {
    pub(crate) stream: bool,
    pub(crate) temperature: f32,
    #[serde(rename = "maxTokens")]
    pub(crate) max_tokens: u32,
}

/// 请求与响应共用的消息形态 {role, text}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct CompletionMessage {
    pub(crate) role: MessageRole,
    pub(crate) text: String,
}

/// 整段响应与逐行流式响应共用同一文档结构
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CompletionResponse {
    pub(crate) result: CompletionResult,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CompletionResult {
    #[serde(default)]
    pub(crate) alternatives: Vec<CompletionAlternative>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct CompletionAlternative {
    pub(crate) message: CompletionMessage,
}
