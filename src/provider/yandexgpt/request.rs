use serde_json::Value;

use crate::error::LLMError;
use crate::types::Message;

use super::provider::YandexGptConfig;
use super::types::{CompletionMessage, CompletionOptions, CompletionRequest};

/// 构造 completion 请求体 `request_extra` 最后合并
pub(crate) fn build_completion_payload(
    config: &YandexGptConfig,
    messages: &[Message],
    temperature: f32,
    stream: bool,
) -> Result<Value, LLMError> {
    let request = CompletionRequest {
        model_uri: model_uri(config),
        completion_options: CompletionOptions {
            stream,
            temperature,
            max_tokens: config.max_tokens,
        },
        messages: convert_messages(messages)?,
    };

    let mut payload = serde_json::to_value(&request)
        .map_err(|err| LLMError::validation(format!("failed to serialize request: {err}")))?;
    if let Value::Object(object) = &mut payload {
        for (key, value) in &config.request_extra {
            object.insert(key.clone(), value.clone());
        }
    }
    Ok(payload)
}

/// `gpt://<folder>/<model>/<version>` 形式的模型标识
pub(crate) fn model_uri(config: &YandexGptConfig) -> String {
    format!(
        "gpt://{}/{}/{}",
        config.folder_id, config.model_name, config.model_version
    )
}

/// 该报文只有 {role, text} 一种消息形态 图像内容无法表达
fn convert_messages(messages: &[Message]) -> Result<Vec<CompletionMessage>, LLMError> {
    messages
        .iter()
        .map(|message| {
            if message.content.has_images() {
                return Err(LLMError::validation(
                    "image content is not supported by this provider",
                ));
            }
            Ok(CompletionMessage {
                role: message.role,
                text: message.text(),
            })
        })
        .collect()
}
