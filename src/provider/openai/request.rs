use serde_json::{Map, Value};

use crate::error::LLMError;
use crate::types::{ContentItem, Message, MessageContent, MessageRole};

use super::provider::OpenAiConfig;
use super::types::{
    ChatCompletionsContent, ChatCompletionsContentPart, ChatCompletionsImageUrl,
    ChatCompletionsMessage,
};

/// 构造 Chat Completions 请求体
///
/// `request_extra` 里的键最后合并 允许调用方覆盖默认字段
pub(crate) fn build_completions_payload(
    config: &OpenAiConfig,
    messages: &[Message],
    temperature: f32,
    stream: bool,
) -> Result<Value, LLMError> {
    let wire_messages = prepare_messages(config, messages)?;
    let messages_value = serde_json::to_value(&wire_messages)
        .map_err(|err| LLMError::validation(format!("failed to serialize messages: {err}")))?;

    let mut body = Map::new();
    body.insert("stream".to_string(), Value::Bool(stream));
    body.insert(
        "model".to_string(),
        Value::String(config.model_name.clone()),
    );
    body.insert("messages".to_string(), messages_value);
    body.insert("temperature".to_string(), Value::from(temperature));
    for (key, value) in &config.request_extra {
        body.insert(key.clone(), value.clone());
    }
    Ok(Value::Object(body))
}

/// 把统一消息模型映射到线上报文 需要时执行 user/assistant 交替归一化
pub(crate) fn prepare_messages(
    config: &OpenAiConfig,
    messages: &[Message],
) -> Result<Vec<ChatCompletionsMessage>, LLMError> {
    if config.force_user_assistant_message_alternation {
        return Ok(make_user_assistant_alternate_messages(messages));
    }
    messages.iter().map(convert_message).collect()
}

fn convert_message(message: &Message) -> Result<ChatCompletionsMessage, LLMError> {
    let content = match &message.content {
        MessageContent::Text(text) => ChatCompletionsContent::Text(text.clone()),
        MessageContent::Items(items) => {
            if items.is_empty() {
                return Err(LLMError::validation("message content item list is empty"));
            }
            ChatCompletionsContent::Parts(items.iter().map(convert_content_item).collect())
        }
    };
    Ok(ChatCompletionsMessage {
        role: message.role,
        content,
    })
}

fn convert_content_item(item: &ContentItem) -> ChatCompletionsContentPart {
    match item {
        ContentItem::Text { text } => ChatCompletionsContentPart::Text { text: text.clone() },
        ContentItem::Image { image_url } => ChatCompletionsContentPart::ImageUrl {
            image_url: ChatCompletionsImageUrl {
                url: image_url.clone(),
            },
        },
    }
}

/// Merges consecutive same-speaker turns so the provider only ever sees
/// strictly alternating `user`/`assistant` messages.
///
/// Some OpenAI-compatible deployments (Gemma 2 among them) reject a bare
/// `system` role and consecutive same-role turns. Empty and whitespace-only
/// messages are dropped; `system` merges into the adjacent `user` turn;
/// merged chunks are joined with a blank line. Running the normalization on
/// its own output is a no-op.
pub(crate) fn make_user_assistant_alternate_messages(
    messages: &[Message],
) -> Vec<ChatCompletionsMessage> {
    let mut normalized = Vec::new();
    let mut current_role = MessageRole::User;
    let mut current_chunks: Vec<String> = Vec::new();

    for message in messages {
        let text = message.text();
        if text.trim().is_empty() {
            continue;
        }

        // system counts as user for merge purposes
        let effective_role = match message.role {
            MessageRole::Assistant => MessageRole::Assistant,
            MessageRole::System | MessageRole::User => MessageRole::User,
        };

        if effective_role == current_role {
            current_chunks.push(text);
        } else {
            if !current_chunks.is_empty() {
                normalized.push(ChatCompletionsMessage {
                    role: current_role,
                    content: ChatCompletionsContent::Text(current_chunks.join("\n\n")),
                });
            }
            current_chunks = vec![text];
            current_role = effective_role;
        }
    }

    if !current_chunks.is_empty() {
        normalized.push(ChatCompletionsMessage {
            role: current_role,
            content: ChatCompletionsContent::Text(current_chunks.join("\n\n")),
        });
    }

    normalized
}
