use crate::error::{LLMError, body_contains};

/// vLLM and compatible servers report an oversized prompt with this phrase.
/// String-matching on vendor error text is fragile by nature; the pattern is
/// kept byte-for-byte as observed in production responses.
const OUT_OF_TOKENS_PATTERN: &[u8] = b"Please reduce the length of the messages";

/// 把重试耗尽后的状态错误翻译成对外错误
pub(crate) fn convert_status_error(err: LLMError) -> LLMError {
    match err {
        LLMError::HttpStatus { status, body } => classify_status(status, body),
        other => other,
    }
}

fn classify_status(status: u16, body: Vec<u8>) -> LLMError {
    if status == 400 && body_contains(&body, OUT_OF_TOKENS_PATTERN) {
        return LLMError::OutOfTokensOrSymbols { body };
    }
    LLMError::Response { body }
}
