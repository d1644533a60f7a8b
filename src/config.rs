use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::http::DynHttpTransport;
use crate::provider::DynProvider;
use crate::provider::mock::{MockConfig, MockProvider};
use crate::provider::openai::{OpenAiConfig, OpenAiProvider};
use crate::provider::yandexgpt::{YandexGptConfig, YandexGptProvider};
use crate::retry::RetryPolicy;

/// 全部受支持后端的封闭配置并集 以 `api_type` 字段区分
///
/// 新增后端需要同时添加枚举变体和 [`build_provider`] 的匹配分支
/// 编译器会保证匹配穷尽
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "api_type", rename_all = "snake_case")]
pub enum AnyLLMConfig {
    #[serde(rename = "openai")]
    OpenAi(OpenAiConfig),
    #[serde(rename = "yandexgpt")]
    YandexGpt(YandexGptConfig),
    Mock(MockConfig),
}

/// 根据配置构建 Provider
///
/// Mock 后端不经过网络 传入的 transport 对它无效
pub fn build_provider(
    config: AnyLLMConfig,
    transport: DynHttpTransport,
    retry: RetryPolicy,
) -> DynProvider {
    match config {
        AnyLLMConfig::OpenAi(config) => {
            Arc::new(OpenAiProvider::new(config, transport).with_retry_policy(retry))
        }
        AnyLLMConfig::YandexGpt(config) => {
            Arc::new(YandexGptProvider::new(config, transport).with_retry_policy(retry))
        }
        AnyLLMConfig::Mock(config) => Arc::new(MockProvider::new(config)),
    }
}
