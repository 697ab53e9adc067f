//! Automatic meanings and example sentences for words added by the learner.

use kaiwa_algo::Difficulty;
use serde::Serialize;

use crate::services::generator::{GenerationRequest, TextGenerator};
use crate::services::prompts::definition_prompt;

pub const GENERATION_FAILED_PLACEHOLDER: &str = "（自動生成に失敗しました）";

const MEANING_LABEL: &str = "日本語での意味";
const EXAMPLE_LABEL: &str = "例文";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordDefinition {
    pub definition: String,
    pub example: String,
}

impl WordDefinition {
    fn failed() -> Self {
        Self {
            definition: GENERATION_FAILED_PLACEHOLDER.to_string(),
            example: GENERATION_FAILED_PLACEHOLDER.to_string(),
        }
    }

    pub fn is_generated(&self) -> bool {
        self.definition != GENERATION_FAILED_PLACEHOLDER
    }

    /// The example sentence, unless only the placeholder came back
    pub fn generated_example(&self) -> Option<&str> {
        (self.example != GENERATION_FAILED_PLACEHOLDER).then_some(self.example.as_str())
    }
}

pub async fn generate_word_definition(
    generator: &dyn TextGenerator,
    word: &str,
    level: Difficulty,
) -> WordDefinition {
    let request = GenerationRequest::prompt(definition_prompt(word, level));
    let text = match generator.generate(&request).await {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(error = %err, word, "word definition generation failed");
            return WordDefinition::failed();
        }
    };

    WordDefinition {
        definition: extract_field(&text, MEANING_LABEL)
            .unwrap_or_else(|| GENERATION_FAILED_PLACEHOLDER.to_string()),
        example: extract_field(&text, EXAMPLE_LABEL)
            .unwrap_or_else(|| GENERATION_FAILED_PLACEHOLDER.to_string()),
    }
}

/// Value following `label` and an ASCII or full-width colon, up to end of line.
fn extract_field(text: &str, label: &str) -> Option<String> {
    text.lines().find_map(|line| {
        let (_, rest) = line.split_once(label)?;
        let rest = rest.strip_prefix(':').or_else(|| rest.strip_prefix('：'))?;
        let value = rest.trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::llm_provider::LLMError;
    use async_trait::async_trait;

    struct Fixed(Option<&'static str>);

    #[async_trait]
    impl TextGenerator for Fixed {
        async fn generate(&self, _request: &GenerationRequest) -> Result<String, LLMError> {
            self.0.map(str::to_string).ok_or(LLMError::EmptyChoices)
        }
    }

    #[tokio::test]
    async fn test_parses_both_colon_styles() {
        let generator = Fixed(Some(
            "- 日本語での意味: りんご\n- 例文：I ate an apple for breakfast.\n",
        ));
        let definition = generate_word_definition(&generator, "apple", Difficulty::Beginner).await;
        assert_eq!(definition.definition, "りんご");
        assert_eq!(definition.example, "I ate an apple for breakfast.");
        assert!(definition.is_generated());
    }

    #[tokio::test]
    async fn test_missing_field_uses_placeholder() {
        let generator = Fixed(Some("日本語での意味: 走る"));
        let definition = generate_word_definition(&generator, "run", Difficulty::Beginner).await;
        assert_eq!(definition.definition, "走る");
        assert_eq!(definition.example, GENERATION_FAILED_PLACEHOLDER);
        assert!(definition.is_generated());
        assert_eq!(definition.generated_example(), None);
    }

    #[tokio::test]
    async fn test_failure_uses_placeholders() {
        let definition = generate_word_definition(&Fixed(None), "run", Difficulty::Advanced).await;
        assert_eq!(definition, WordDefinition::failed());
        assert!(!definition.is_generated());
    }
}
