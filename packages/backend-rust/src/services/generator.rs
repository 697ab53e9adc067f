//! The text-generation seam used by conversation, translation and definitions.

use async_trait::async_trait;
use kaiwa_algo::{ContextWindow, FragmentKind};

use crate::services::llm_provider::{ChatMessage, LLMError, LLMProvider};

/// An ordered list of chat messages sent to the model
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationRequest {
    pub messages: Vec<ChatMessage>,
}

impl GenerationRequest {
    /// The system instruction fragment becomes the system message; every
    /// other fragment is sent as its own user message, in order.
    pub fn from_window(window: &ContextWindow<'_>) -> Self {
        let messages = window
            .fragments
            .iter()
            .map(|fragment| match fragment.kind {
                FragmentKind::SystemInstruction => ChatMessage::system(fragment.text.clone()),
                _ => ChatMessage::user(fragment.text.clone()),
            })
            .collect();
        Self { messages }
    }

    pub fn with_system(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
        }
    }

    pub fn prompt(user: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::user(user)],
        }
    }

    pub fn system_text(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == "system")
            .map(|m| m.content.as_str())
    }
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LLMError>;

    /// False when every call is known to fail (missing credentials)
    fn is_available(&self) -> bool {
        true
    }
}

#[async_trait]
impl TextGenerator for LLMProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, LLMError> {
        let response = self.chat(&request.messages).await?;
        response
            .first_content()
            .map(|s| s.to_string())
            .ok_or(LLMError::EmptyChoices)
    }

    fn is_available(&self) -> bool {
        LLMProvider::is_available(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kaiwa_algo::{build_window, Difficulty, Turn};

    #[test]
    fn test_request_from_window_maps_roles() {
        let history = vec![Turn::user("Hello")];
        let window = build_window("SYS", &history, Difficulty::Beginner, 9);
        let request = GenerationRequest::from_window(&window);

        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.system_text(), Some("SYS"));
        assert_eq!(request.messages[1].role, "user");
        assert_eq!(request.messages[1].content, "Current user message: Hello");
        assert!(request.messages[2].content.starts_with("Respond naturally"));
    }
}
