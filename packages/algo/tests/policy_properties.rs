//! Property-Based Tests for the leveling and history policies
//!
//! Invariants:
//! - level is floor(experience / 100) + 1 and the fraction is (experience mod 100) / 100
//! - trimming keeps exactly the most recent `cap` turns, in order
//! - the context payload never carries more than one assistant reply

use proptest::prelude::*;

use kaiwa_algo::{build_window, level_of, trim_history, Difficulty, FragmentKind, Turn};

fn arb_turn() -> impl Strategy<Value = Turn> {
    (any::<bool>(), "[a-z ]{1,12}").prop_map(|(is_user, text)| {
        if is_user {
            Turn::user(text)
        } else {
            Turn::assistant(text, None, Vec::new())
        }
    })
}

proptest! {
    #[test]
    fn prop_level_formula(experience in 0u64..10_000_000) {
        let progress = level_of(experience);
        prop_assert_eq!(progress.level as u64, experience / 100 + 1);
        prop_assert!((progress.progress_fraction - (experience % 100) as f64 / 100.0).abs() < 1e-12);
        prop_assert!(progress.progress_fraction >= 0.0 && progress.progress_fraction < 1.0);
    }

    #[test]
    fn prop_trim_keeps_most_recent(turns in prop::collection::vec(arb_turn(), 0..40), cap in 1usize..15) {
        let mut trimmed = turns.clone();
        trim_history(&mut trimmed, cap);
        let expected_len = turns.len().min(cap);
        prop_assert_eq!(trimmed.len(), expected_len);
        prop_assert_eq!(&trimmed[..], &turns[turns.len() - expected_len..]);
    }

    #[test]
    fn prop_window_bounds(turns in prop::collection::vec(arb_turn(), 0..30)) {
        let window = build_window("SYS", &turns, Difficulty::Beginner, 9);
        prop_assert!(window.turns.len() <= 9);
        prop_assert!(window.assistant_fragments() <= 1);
        prop_assert!(window.count(FragmentKind::CurrentUserMessage) <= 1);
        prop_assert_eq!(window.fragments[0].kind, FragmentKind::SystemInstruction);
        prop_assert_eq!(window.fragments.last().map(|f| f.kind), Some(FragmentKind::Directive));
    }
}
