use crate::error::{LLMError, body_contains};

/// Patterns observed in real 400 bodies when a prompt exceeds the model
/// limits. Deployment-specific free-text matching, kept verbatim for
/// compatibility; not a stable contract on the provider side.
const TOKEN_LIMIT_PATTERN: &[u8] = b"number of input tokens must be no more than";
const TEXT_LENGTH_PATTERN: &[u8] = b"text length is";
const RANGE_PATTERN: &[u8] = b"which is outside the range";

/// 把重试耗尽后的状态错误翻译成对外错误
pub(crate) fn convert_status_error(err: LLMError) -> LLMError {
    match err {
        LLMError::HttpStatus { status, body } => classify_status(status, body),
        other => other,
    }
}

fn classify_status(status: u16, body: Vec<u8>) -> LLMError {
    if status == 400
        && (body_contains(&body, TOKEN_LIMIT_PATTERN)
            || (body_contains(&body, TEXT_LENGTH_PATTERN) && body_contains(&body, RANGE_PATTERN)))
    {
        return LLMError::OutOfTokensOrSymbols { body };
    }
    LLMError::Response { body }
}
