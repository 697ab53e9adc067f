//! Context Window Policy
//!
//! Decides which turns of a conversation accompany the next generation
//! request, and how stored history is trimmed from the head.

use serde::{Deserialize, Serialize};

use crate::types::{Difficulty, Role, Turn};

const CURRENT_USER_LABEL: &str = "Current user message";
const PREVIOUS_USER_LABEL: &str = "Previous user message";
const PREVIOUS_RESPONSE_LABEL: &str = "Previous response";

/// What a payload fragment carries
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    SystemInstruction,
    CurrentUserMessage,
    PreviousUserMessage,
    PreviousResponse,
    Directive,
}

/// One labelled text part of a generation request
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptFragment {
    pub kind: FragmentKind,
    pub text: String,
}

impl PromptFragment {
    fn new(kind: FragmentKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// The windowed history plus the assembled request payload
#[derive(Clone, Debug)]
pub struct ContextWindow<'a> {
    /// Most recent history turns considered, in conversation order
    pub turns: &'a [Turn],
    /// System instruction first, directive last
    pub fragments: Vec<PromptFragment>,
}

impl ContextWindow<'_> {
    pub fn assistant_fragments(&self) -> usize {
        self.count(FragmentKind::PreviousResponse)
    }

    pub fn count(&self, kind: FragmentKind) -> usize {
        self.fragments.iter().filter(|f| f.kind == kind).count()
    }
}

/// Build the request payload for the next reply.
///
/// Only the latest user turn in the window is labelled as the current
/// message, and only the latest assistant turn is carried at all; older
/// replies stay in stored history but are left out of the payload.
pub fn build_window<'a>(
    system_instruction: &str,
    history: &'a [Turn],
    difficulty: Difficulty,
    window_size: usize,
) -> ContextWindow<'a> {
    let start = history.len().saturating_sub(window_size);
    let turns = &history[start..];

    let last_user = turns.iter().rposition(|t| t.role == Role::User);
    let last_assistant = turns.iter().rposition(|t| t.role == Role::Assistant);

    let mut fragments = Vec::with_capacity(turns.len() + 2);
    fragments.push(PromptFragment::new(
        FragmentKind::SystemInstruction,
        system_instruction,
    ));

    for (index, turn) in turns.iter().enumerate() {
        let fragment = match turn.role {
            Role::User if Some(index) == last_user => PromptFragment::new(
                FragmentKind::CurrentUserMessage,
                format!("{CURRENT_USER_LABEL}: {}", turn.content),
            ),
            Role::User => PromptFragment::new(
                FragmentKind::PreviousUserMessage,
                format!("{PREVIOUS_USER_LABEL}: {}", turn.content),
            ),
            Role::Assistant if Some(index) == last_assistant => PromptFragment::new(
                FragmentKind::PreviousResponse,
                format!("{PREVIOUS_RESPONSE_LABEL}: {}", turn.content),
            ),
            Role::Assistant => continue,
        };
        fragments.push(fragment);
    }

    fragments.push(PromptFragment::new(
        FragmentKind::Directive,
        reply_directive(difficulty),
    ));

    ContextWindow { turns, fragments }
}

/// Drop the oldest turns until at most `cap` remain. Returns how many were dropped.
pub fn trim_history(turns: &mut Vec<Turn>, cap: usize) -> usize {
    let excess = turns.len().saturating_sub(cap);
    if excess > 0 {
        turns.drain(..excess);
    }
    excess
}

fn reply_directive(difficulty: Difficulty) -> String {
    format!(
        "Respond naturally to the current user message ({} level).\n\
ONLY include greetings like \"Hello\" or \"Hi\" when replying to a user's greeting.\n\
DO NOT include greetings in every response.\n\
Focus primarily on the current message and generate a fresh, unique response.\n\
Avoid repetitive patterns in your responses.\n\
Each response should be different in structure and wording from previous ones.\n\
Be creative and varied in your expression style.",
        difficulty.as_str()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alternating(count: usize) -> Vec<Turn> {
        (0..count)
            .map(|i| {
                if i % 2 == 0 {
                    Turn::user(format!("u{i}"))
                } else {
                    Turn::assistant(format!("a{i}"), None, Vec::new())
                }
            })
            .collect()
    }

    #[test]
    fn test_system_instruction_first_and_directive_last() {
        let history = alternating(3);
        let window = build_window("SYS", &history, Difficulty::Beginner, 9);
        assert_eq!(window.fragments[0].kind, FragmentKind::SystemInstruction);
        assert_eq!(window.fragments[0].text, "SYS");
        let last = window.fragments.last().unwrap();
        assert_eq!(last.kind, FragmentKind::Directive);
        assert!(last.text.contains("beginner level"));
    }

    #[test]
    fn test_window_of_twelve_turns_keeps_nine_and_one_reply() {
        // u0 a1 ... u10 a11 u12: a current user message after twelve turns
        let history = alternating(13);
        let window = build_window("SYS", &history, Difficulty::Intermediate, 9);

        assert_eq!(window.turns.len(), 9);
        assert_eq!(window.turns, &history[4..]);
        assert_eq!(window.assistant_fragments(), 1);
        assert_eq!(window.count(FragmentKind::CurrentUserMessage), 1);
        assert_eq!(window.count(FragmentKind::PreviousUserMessage), 4);

        let reply = window
            .fragments
            .iter()
            .find(|f| f.kind == FragmentKind::PreviousResponse)
            .unwrap();
        assert_eq!(reply.text, "Previous response: a11");
    }

    #[test]
    fn test_twelve_turns_ending_with_reply() {
        let history = alternating(12);
        let window = build_window("SYS", &history, Difficulty::Beginner, 9);
        assert_eq!(window.turns.len(), 9);
        assert_eq!(window.assistant_fragments(), 1);
        assert!(window
            .fragments
            .iter()
            .any(|f| f.text == "Previous response: a11"));
        assert!(window
            .fragments
            .iter()
            .any(|f| f.text == "Current user message: u10"));
    }

    #[test]
    fn test_short_history_included_entirely() {
        let history = alternating(4);
        let window = build_window("SYS", &history, Difficulty::Beginner, 9);
        assert_eq!(window.turns.len(), 4);
        // system + 2 users + 1 reply + directive
        assert_eq!(window.fragments.len(), 5);
    }

    #[test]
    fn test_empty_history() {
        let window = build_window("SYS", &[], Difficulty::Advanced, 9);
        assert!(window.turns.is_empty());
        assert_eq!(window.fragments.len(), 2);
    }

    #[test]
    fn test_labels_order_preserved() {
        let history = alternating(3);
        let window = build_window("SYS", &history, Difficulty::Beginner, 9);
        let texts: Vec<&str> = window.fragments[1..3].iter().map(|f| f.text.as_str()).collect();
        assert_eq!(
            texts,
            vec!["Previous user message: u0", "Previous response: a1"]
        );
        assert_eq!(window.fragments[3].text, "Current user message: u2");
    }

    #[test]
    fn test_trim_history_drops_oldest() {
        let mut turns = alternating(14);
        let dropped = trim_history(&mut turns, 10);
        assert_eq!(dropped, 4);
        assert_eq!(turns.len(), 10);
        assert_eq!(turns[0].content, "u4");
        assert_eq!(turns[9].content, "a13");
    }

    #[test]
    fn test_trim_history_under_cap_is_noop() {
        let mut turns = alternating(3);
        assert_eq!(trim_history(&mut turns, 10), 0);
        assert_eq!(turns.len(), 3);
    }
}
