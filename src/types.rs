//! Shared data structures modeling chat messages exchanged with providers.
//!
//! These types normalize provider-specific payloads so the rest of the crate
//! can stay agnostic of individual API differences. Messages are immutable
//! value objects: created by callers, consumed read-only by providers.

use serde::{Deserialize, Serialize};

use crate::error::LLMError;

/// Chat role understood by every supported provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// Single piece of multimodal message content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentItem {
    /// Plain UTF-8 text.
    Text { text: String },
    /// Image referenced by URL, including `data:` URLs for inline payloads.
    Image { image_url: String },
}

/// Message content: either a bare string or an ordered list of content items.
///
/// The item list must hold at least one element; use
/// [`MessageContent::items`] to construct the list form with that invariant
/// checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Items(Vec<ContentItem>),
}

impl MessageContent {
    /// Builds list-form content, rejecting an empty item list.
    ///
    /// # Errors
    ///
    /// Returns [`LLMError::InvalidConfig`] when `items` is empty.
    pub fn items(items: Vec<ContentItem>) -> Result<Self, LLMError> {
        if items.is_empty() {
            return Err(LLMError::InvalidConfig {
                field: "content".to_string(),
                reason: "content item list must not be empty".to_string(),
            });
        }
        Ok(Self::Items(items))
    }

    /// Concatenates every text item into one string.
    ///
    /// Image items carry no text and are skipped. Multiple text items are
    /// joined with a newline.
    pub fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Items(items) => items
                .iter()
                .filter_map(|item| match item {
                    ContentItem::Text { text } => Some(text.as_str()),
                    ContentItem::Image { .. } => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// Returns `true` when any item references an image.
    pub fn has_images(&self) -> bool {
        match self {
            Self::Text(_) => false,
            Self::Items(items) => items
                .iter()
                .any(|item| matches!(item, ContentItem::Image { .. })),
        }
    }
}

impl From<String> for MessageContent {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// One chat turn sent to or received from a provider.
///
/// # Examples
///
/// ```
/// use musubi::types::{Message, MessageRole};
///
/// let msg = Message::user("Why is the sky blue?");
/// assert_eq!(msg.role, MessageRole::User);
/// assert_eq!(msg.text(), "Why is the sky blue?");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: MessageContent,
}

impl Message {
    /// 构造 system 消息
    pub fn system(content: impl Into<MessageContent>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    /// 构造 user 消息
    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// 构造 assistant 消息
    pub fn assistant(content: impl Into<MessageContent>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    /// Flattened text of the message content, see [`MessageContent::text`].
    pub fn text(&self) -> String {
        self.content.text()
    }
}
