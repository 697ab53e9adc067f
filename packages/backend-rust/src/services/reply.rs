//! Parsing of the model's structured reply.

use kaiwa_algo::CorrectionRecord;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StructuredReply {
    #[serde(default)]
    pub response: Option<serde_json::Value>,
    #[serde(default)]
    pub translation: Option<String>,
    #[serde(default)]
    pub corrections: Option<Vec<CorrectionRecord>>,
}

/// A validated assistant reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedReply {
    pub response: String,
    pub translation: String,
    pub corrections: Vec<CorrectionRecord>,
}

#[derive(Debug, Error)]
pub enum ReplyParseError {
    #[error("reply is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("reply has no usable response field")]
    MissingResponse,
    #[error("reply response is not in English")]
    NonEnglish,
}

pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let inner = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

pub fn parse_reply(raw: &str) -> Result<ParsedReply, ReplyParseError> {
    let reply: StructuredReply = serde_json::from_str(strip_code_fences(raw))?;

    let response = match reply.response {
        Some(serde_json::Value::String(text)) if !text.trim().is_empty() => text,
        _ => return Err(ReplyParseError::MissingResponse),
    };
    if starts_with_non_latin_letter(&response) {
        return Err(ReplyParseError::NonEnglish);
    }

    Ok(ParsedReply {
        response,
        translation: reply.translation.unwrap_or_default(),
        corrections: reply.corrections.unwrap_or_default(),
    })
}

fn starts_with_non_latin_letter(text: &str) -> bool {
    match text.trim_start().chars().next() {
        Some(c) => c.is_alphabetic() && !is_latin_letter(c),
        None => false,
    }
}

fn is_latin_letter(c: char) -> bool {
    c.is_ascii_alphabetic()
        || matches!(c, '\u{00C0}'..='\u{024F}' | '\u{1E00}'..='\u{1EFF}')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_fenced_reply_with_corrections() {
        let raw = "```json\n{\"response\":\"Nice to meet you!\",\"translation\":\"はじめまして！\",\
\"corrections\":[{\"original\":\"I goed\",\"correction\":\"I went\",\"explanation\":\"past tense\"}]}\n```";
        let reply = parse_reply(raw).unwrap();
        assert_eq!(reply.response, "Nice to meet you!");
        assert_eq!(reply.translation, "はじめまして！");
        assert_eq!(reply.corrections.len(), 1);
        assert_eq!(reply.corrections[0].corrected, "I went");
    }

    #[test]
    fn test_missing_corrections_and_translation_default() {
        let reply = parse_reply(r#"{"response":"Sure."}"#).unwrap();
        assert!(reply.corrections.is_empty());
        assert_eq!(reply.translation, "");
    }

    #[test]
    fn test_rejects_japanese_leading_response() {
        let err = parse_reply(r#"{"response":"こんにちは","translation":"x"}"#).unwrap_err();
        assert!(matches!(err, ReplyParseError::NonEnglish));
    }

    #[test]
    fn test_accepts_accented_and_punctuated_starts() {
        assert!(parse_reply(r#"{"response":"Éclair is French."}"#).is_ok());
        assert!(parse_reply(r#"{"response":"\"Quote\" first"}"#).is_ok());
        assert!(parse_reply(r#"{"response":"42 is the answer"}"#).is_ok());
    }

    #[test]
    fn test_rejects_missing_blank_or_non_string_response() {
        assert!(matches!(
            parse_reply(r#"{"translation":"x"}"#),
            Err(ReplyParseError::MissingResponse)
        ));
        assert!(matches!(
            parse_reply(r#"{"response":"   "}"#),
            Err(ReplyParseError::MissingResponse)
        ));
        assert!(matches!(
            parse_reply(r#"{"response":42}"#),
            Err(ReplyParseError::MissingResponse)
        ));
    }

    #[test]
    fn test_rejects_non_json() {
        assert!(matches!(
            parse_reply("Sorry, I can't do that."),
            Err(ReplyParseError::Json(_))
        ));
    }
}
