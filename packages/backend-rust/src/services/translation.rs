use crate::services::generator::{GenerationRequest, TextGenerator};
use crate::services::prompts::TRANSLATION_INSTRUCTION;

/// True when the text only uses characters common in plain English input.
pub fn is_probably_english(text: &str) -> bool {
    let trimmed = text.trim();
    !trimmed.is_empty()
        && trimmed.chars().all(|c| {
            c.is_ascii_alphanumeric()
                || c.is_whitespace()
                || matches!(c, '.' | ',' | '!' | '?' | '\'' | '"' | '(' | ')' | '-')
        })
}

/// Translate learner input to English. Never fails: on any error the input
/// is returned unchanged.
pub async fn translate_to_english(generator: &dyn TextGenerator, text: &str) -> String {
    if is_probably_english(text) {
        return text.to_string();
    }

    let request = GenerationRequest::with_system(TRANSLATION_INSTRUCTION, text);
    match generator.generate(&request).await {
        Ok(translated) if !translated.trim().is_empty() => translated.trim().to_string(),
        Ok(_) => text.to_string(),
        Err(err) => {
            tracing::warn!(error = %err, "translation failed, keeping original text");
            text.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::llm_provider::LLMError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        result: Option<&'static str>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TextGenerator for Fixed {
        async fn generate(&self, _request: &GenerationRequest) -> Result<String, LLMError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result
                .map(str::to_string)
                .ok_or(LLMError::EmptyChoices)
        }
    }

    #[test]
    fn test_english_detection() {
        assert!(is_probably_english("Hello, how are you?"));
        assert!(is_probably_english("It's 5 o'clock (maybe)."));
        assert!(!is_probably_english("こんにちは"));
        assert!(!is_probably_english("Hello 世界"));
        assert!(!is_probably_english("   "));
        assert!(!is_probably_english("cost: $5"));
    }

    #[tokio::test]
    async fn test_english_input_skips_generator() {
        let generator = Fixed {
            result: Some("unused"),
            calls: AtomicUsize::new(0),
        };
        assert_eq!(translate_to_english(&generator, "Hello").await, "Hello");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_japanese_input_translated() {
        let generator = Fixed {
            result: Some("  Good morning \n"),
            calls: AtomicUsize::new(0),
        };
        assert_eq!(
            translate_to_english(&generator, "おはよう").await,
            "Good morning"
        );
    }

    #[tokio::test]
    async fn test_failure_returns_input() {
        let generator = Fixed {
            result: None,
            calls: AtomicUsize::new(0),
        };
        assert_eq!(translate_to_english(&generator, "おはよう").await, "おはよう");
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
    }
}
