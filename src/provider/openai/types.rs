use serde::{Deserialize, Serialize};

use crate::types::MessageRole;

/// Chat Completions 线上报文中的一条消息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ChatCompletionsMessage {
    pub(crate) role: MessageRole,
    pub(crate) content: ChatCompletionsContent,
}

/// 消息内容 纯文本或多模态分段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum ChatCompletionsContent {
    Text(String),
    Parts(Vec<ChatCompletionsContentPart>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum ChatCompletionsContentPart {
    Text { text: String },
    ImageUrl { image_url: ChatCompletionsImageUrl },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct ChatCompletionsImageUrl {
    pub(crate) url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChatCompletionsResponse {
    pub(crate) choices: Vec<OneNotStreamingChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OneNotStreamingChoice {
    pub(crate) message: NotStreamingMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct NotStreamingMessage {
    #[serde(default)]
    pub(crate) content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ChatCompletionsStreamingEvent {
    #[serde(default)]
    pub(crate) choices: Vec<OneStreamingChoice>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct OneStreamingChoice {
    #[serde(default)]
    pub(crate) delta: OneStreamingChoiceDelta,
}

/// 增量事件里的 delta 片段 role-only 或空 content 均视为心跳
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct OneStreamingChoiceDelta {
    #[serde(default)]
    pub(crate) content: Option<String>,
}
