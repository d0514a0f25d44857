//! Chat model trait used by the apply-edit flow.
//!
//! Provider clients are host collaborators; Quill only needs whole-text
//! generation and a delta stream.

use anyhow::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate a complete response.
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Stream the response as text deltas.
    async fn stream(&self, messages: &[ChatMessage]) -> Result<BoxStream<'static, Result<String>>>;
}
