//! Common Types and Constants
//!
//! Shared data structures used across the policy modules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ==================== Constants ====================

/// Non-system turns retained in a conversation session
pub const DEFAULT_HISTORY_CAP: usize = 10;

/// History turns considered when building a generation request
pub const DEFAULT_CONTEXT_TURNS: usize = 9;

/// Cards drawn from the default pool for one study session
pub const DEFAULT_POOL_SAMPLE: usize = 10;

/// Upper bound on a study session built from the user's own study list
pub const DEFAULT_STUDY_CAP: usize = 50;

// ==================== Conversation Types ====================

/// Speaker of a turn
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Some(Self::User),
            // older message logs used "bot"
            "assistant" | "bot" => Some(Self::Assistant),
            _ => None,
        }
    }
}

/// A grammar correction attached to an assistant reply
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrectionRecord {
    pub original: String,
    /// The model emits this field as `correction`
    #[serde(alias = "correction")]
    pub corrected: String,
    #[serde(default)]
    pub explanation: String,
}

/// One message in a conversation
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Turn {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub corrections: Vec<CorrectionRecord>,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            translation: None,
            corrections: Vec::new(),
        }
    }

    pub fn assistant(
        content: impl Into<String>,
        translation: Option<String>,
        corrections: Vec<CorrectionRecord>,
    ) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            translation,
            corrections,
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }
}

/// Conversation and vocabulary difficulty
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "beginner" => Some(Self::Beginner),
            "intermediate" => Some(Self::Intermediate),
            "advanced" => Some(Self::Advanced),
            _ => None,
        }
    }

    /// Hardest vocabulary difficulty offered to a learner at `level`
    pub fn ceiling_for_level(level: u32) -> Self {
        if level < 10 {
            Self::Beginner
        } else if level < 20 {
            Self::Intermediate
        } else {
            Self::Advanced
        }
    }
}

// ==================== Vocabulary Types ====================

/// A word owned by one learner, either known or still in study
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyWord {
    pub id: String,
    pub word: String,
    pub translation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    #[serde(default)]
    pub mastered: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_studied: Option<DateTime<Utc>>,
}

impl VocabularyWord {
    pub fn new(
        id: impl Into<String>,
        word: impl Into<String>,
        translation: impl Into<String>,
        example: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            word: word.into(),
            translation: translation.into(),
            example,
            mastered: false,
            last_studied: None,
        }
    }
}

/// An entry of the built-in study pool
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolWord {
    pub word: VocabularyWord,
    pub level: Difficulty,
}
