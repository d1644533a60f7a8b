//! LLM 多后端统一调用库 支持整段响应与部分响应流式两种模式

pub mod config;
pub mod error;
pub mod http;
pub mod provider;
pub mod retry;
pub mod stream;
pub mod types;

pub use config::{AnyLLMConfig, build_provider};
pub use error::LLMError;
pub use provider::mock::{MockConfig, MockProvider};
pub use provider::openai::{OpenAiConfig, OpenAiProvider};
pub use provider::yandexgpt::{YandexGptConfig, YandexGptProvider};
pub use provider::{DynProvider, LLMProvider, ResponseStream};
pub use retry::RetryPolicy;
pub use types::{ContentItem, Message, MessageContent, MessageRole};
