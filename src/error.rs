use thiserror::Error;

/// Aggregates every failure mode exposed by the unified LLM client.
///
/// Callers can match on the specific variant to decide whether to shorten the
/// prompt, fall back to another provider, or surface an opaque failure to the
/// user interface.
#[derive(Debug, Error)]
pub enum LLMError {
    /// Represents transport-layer or networking failures.
    #[error("transport error: {message}")]
    Transport { message: String },
    /// Non-2xx response left after retries were exhausted.
    ///
    /// This variant is internal to the request pipeline: every provider
    /// converts it into [`LLMError::Response`] or
    /// [`LLMError::OutOfTokensOrSymbols`] before it can reach the caller.
    #[error("http status {status}: {}", String::from_utf8_lossy(.body))]
    HttpStatus { status: u16, body: Vec<u8> },
    /// Generic provider failure; the raw response body is kept for diagnostics.
    #[error("llm response error: {}", String::from_utf8_lossy(.body))]
    Response { body: Vec<u8> },
    /// The input exceeded the provider's token or symbol limits.
    ///
    /// A refinement of [`LLMError::Response`] detected by matching the error
    /// body against provider-specific patterns. Callers are expected to treat
    /// it as actionable, e.g. truncate the conversation and try again.
    #[error("out of tokens or symbols: {}", String::from_utf8_lossy(.body))]
    OutOfTokensOrSymbols { body: Vec<u8> },
    /// Malformed or unexpected response shape, such as a success body with
    /// zero choices. Never retried: it indicates a schema mismatch, not a
    /// transient condition.
    #[error("invalid response: {message}")]
    Validation { message: String },
    /// Raised when building or validating configuration fails.
    #[error("invalid configuration for {field}: {reason}")]
    InvalidConfig { field: String, reason: String },
}

impl LLMError {
    /// Creates an [`LLMError::Transport`] from a textual description.
    ///
    /// # Examples
    ///
    /// ```
    /// use musubi::error::LLMError;
    ///
    /// let err = LLMError::transport("dns lookup failed");
    /// assert!(matches!(err, LLMError::Transport { .. }));
    /// ```
    pub fn transport<T: Into<String>>(message: T) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates an [`LLMError::Validation`] from a textual description.
    pub fn validation<T: Into<String>>(message: T) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Returns the raw provider response body when the error carries one.
    pub fn response_body(&self) -> Option<&[u8]> {
        match self {
            Self::HttpStatus { body, .. }
            | Self::Response { body }
            | Self::OutOfTokensOrSymbols { body } => Some(body),
            _ => None,
        }
    }
}

/// Returns `true` when `haystack` contains `needle` as a byte subsequence.
/// Provider error bodies are matched as raw bytes since they are not
/// guaranteed to be valid UTF-8.
pub(crate) fn body_contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack
        .windows(needle.len())
        .any(|window| window == needle)
}
