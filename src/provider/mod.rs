use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use futures_core::Stream;

use crate::error::LLMError;
use crate::types::Message;

pub mod mock;
pub mod openai;
pub mod yandexgpt;

/// 部分响应流别名 每个元素是截至当前的完整文本快照
pub type ResponseStream = Pin<Box<dyn Stream<Item = Result<String, LLMError>> + Send>>;

/// 统一的 Provider Trait 所有供应商实现该接口即可接入
///
/// `temperature` 为显式可选参数 传 `None` 时回落到各自配置里的默认值
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// 提交完整请求并等待完整响应文本
    async fn request_response(
        &self,
        messages: Vec<Message>,
        temperature: Option<f32>,
    ) -> Result<String, LLMError>;

    /// 以流式方式返回逐步增长的完整文本快照
    ///
    /// 返回的流被丢弃时 底层连接随之释放 包括消费方提前退出的情况
    async fn stream_response(
        &self,
        messages: Vec<Message>,
        temperature: Option<f32>,
    ) -> Result<ResponseStream, LLMError>;

    /// 供应商名称
    fn name(&self) -> &'static str;
}

/// 线程安全 Provider
pub type DynProvider = Arc<dyn LLMProvider>;
