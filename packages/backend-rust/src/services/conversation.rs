//! Conversation session: turn history, context windowing and reply generation.

use std::sync::Arc;
use std::time::Duration;

use kaiwa_algo::{build_window, trim_history, CorrectionRecord, Difficulty, Turn};
use serde::Serialize;
use thiserror::Error;

use crate::config::SessionConfig;
use crate::services::generator::{GenerationRequest, TextGenerator};
use crate::services::llm_provider::LLMError;
use crate::services::prompts::system_instruction;
use crate::services::reply::{parse_reply, ReplyParseError};

pub const FALLBACK_RESPONSE: &str =
    "I apologize, but I encountered an error processing your message.";
pub const FALLBACK_TRANSLATION: &str =
    "申し訳ありませんが、メッセージの処理中にエラーが発生しました。";

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("message is empty")]
    EmptyMessage,
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Generator(#[from] LLMError),
    #[error("generation timed out after {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Parse(#[from] ReplyParseError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantReply {
    pub response: String,
    pub translation: String,
    pub corrections: Vec<CorrectionRecord>,
}

impl AssistantReply {
    pub fn fallback() -> Self {
        Self {
            response: FALLBACK_RESPONSE.to_string(),
            translation: FALLBACK_TRANSLATION.to_string(),
            corrections: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub enum ReplyOutcome {
    Generated(AssistantReply),
    Fallback {
        reply: AssistantReply,
        cause: GenerationError,
    },
}

impl ReplyOutcome {
    pub fn reply(&self) -> &AssistantReply {
        match self {
            Self::Generated(reply) => reply,
            Self::Fallback { reply, .. } => reply,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }
}

pub struct ConversationSession {
    difficulty: Difficulty,
    system_instruction: String,
    turns: Vec<Turn>,
    generator: Arc<dyn TextGenerator>,
    history_cap: usize,
    context_turns: usize,
    generation_timeout: Duration,
}

impl ConversationSession {
    pub fn new(
        difficulty: Difficulty,
        generator: Arc<dyn TextGenerator>,
        config: &SessionConfig,
    ) -> Self {
        Self {
            difficulty,
            system_instruction: system_instruction(difficulty),
            turns: Vec::new(),
            generator,
            history_cap: config.history_cap,
            context_turns: config.context_turns,
            generation_timeout: config.generation_timeout,
        }
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }

    pub fn history(&self) -> &[Turn] {
        &self.turns
    }

    pub fn append_user_turn(&mut self, text: &str) -> Result<(), TurnError> {
        if text.trim().is_empty() {
            return Err(TurnError::EmptyMessage);
        }
        self.push(Turn::user(text));
        Ok(())
    }

    /// Request a reply to the current history. Failures of any kind produce
    /// the fallback reply and leave the history without an assistant turn.
    pub async fn generate_reply(&mut self) -> ReplyOutcome {
        match self.request_reply().await {
            Ok(reply) => {
                self.push(Turn::assistant(
                    reply.response.clone(),
                    Some(reply.translation.clone()),
                    reply.corrections.clone(),
                ));
                ReplyOutcome::Generated(reply)
            }
            Err(cause) => {
                tracing::warn!(
                    error = %cause,
                    difficulty = self.difficulty.as_str(),
                    "reply generation failed, using fallback"
                );
                ReplyOutcome::Fallback {
                    reply: AssistantReply::fallback(),
                    cause,
                }
            }
        }
    }

    /// Swap the system instruction when the difficulty actually changes.
    pub fn update_difficulty(&mut self, difficulty: Difficulty) -> bool {
        if difficulty == self.difficulty {
            return false;
        }
        self.difficulty = difficulty;
        self.system_instruction = system_instruction(difficulty);
        true
    }

    pub fn clear_history(&mut self) {
        self.turns.clear();
    }

    async fn request_reply(&self) -> Result<AssistantReply, GenerationError> {
        let window = build_window(
            &self.system_instruction,
            &self.turns,
            self.difficulty,
            self.context_turns,
        );
        let request = GenerationRequest::from_window(&window);

        let raw = tokio::time::timeout(self.generation_timeout, self.generator.generate(&request))
            .await
            .map_err(|_| GenerationError::Timeout(self.generation_timeout))??;

        let parsed = parse_reply(&raw).map_err(|err| {
            tracing::debug!(raw = %raw, "unparseable model reply");
            err
        })?;

        Ok(AssistantReply {
            response: parsed.response,
            translation: parsed.translation,
            corrections: parsed.corrections,
        })
    }

    fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
        trim_history(&mut self.turns, self.history_cap);
    }
}
