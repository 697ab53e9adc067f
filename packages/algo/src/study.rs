//! Vocabulary Study Selector
//!
//! Builds the deck for one flashcard session and tracks the learner's
//! `known` / `unknown` judgments while it runs.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::types::{
    Difficulty, PoolWord, VocabularyWord, DEFAULT_POOL_SAMPLE, DEFAULT_STUDY_CAP,
};

/// Bounds applied when selecting a study set
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyLimits {
    pub pool_sample: usize,
    pub study_cap: usize,
}

impl Default for StudyLimits {
    fn default() -> Self {
        Self {
            pool_sample: DEFAULT_POOL_SAMPLE,
            study_cap: DEFAULT_STUDY_CAP,
        }
    }
}

/// Choose the words for one study session.
///
/// The learner's own study list wins when it is non-empty and keeps its
/// order. Otherwise words are sampled from the default pool, skipping
/// anything already known and anything above the learner's level ceiling.
pub fn select_study_set<R: Rng + ?Sized>(
    study_vocabulary: &[VocabularyWord],
    known_vocabulary: &[VocabularyWord],
    default_pool: &[PoolWord],
    user_level: u32,
    limits: StudyLimits,
    rng: &mut R,
) -> Vec<VocabularyWord> {
    if !study_vocabulary.is_empty() {
        return study_vocabulary
            .iter()
            .take(limits.study_cap)
            .cloned()
            .collect();
    }

    let known_ids: HashSet<&str> = known_vocabulary.iter().map(|w| w.id.as_str()).collect();
    let ceiling = Difficulty::ceiling_for_level(user_level);

    let candidates: Vec<&PoolWord> = default_pool
        .iter()
        .filter(|entry| !known_ids.contains(entry.word.id.as_str()))
        .filter(|entry| entry.level <= ceiling)
        .collect();

    let mut selected: Vec<VocabularyWord> = candidates
        .choose_multiple(rng, limits.pool_sample)
        .map(|entry| entry.word.clone())
        .collect();
    selected.shuffle(rng);
    selected
}

/// The learner's verdict on a card
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Judgment {
    Known,
    Unknown,
}

/// Result of a finished study session
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyOutcome {
    pub known: Vec<VocabularyWord>,
    pub unknown: Vec<VocabularyWord>,
}

/// A flashcard session over a fixed, already-ordered set of cards
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyDeck {
    cards: Vec<VocabularyWord>,
    position: usize,
    known: Vec<VocabularyWord>,
    unknown: Vec<VocabularyWord>,
    finished: bool,
}

impl StudyDeck {
    pub fn new(cards: Vec<VocabularyWord>) -> Self {
        let finished = cards.is_empty();
        Self {
            cards,
            position: 0,
            known: Vec::new(),
            unknown: Vec::new(),
            finished,
        }
    }

    pub fn cards(&self) -> &[VocabularyWord] {
        &self.cards
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn current(&self) -> Option<&VocabularyWord> {
        if self.finished {
            return None;
        }
        self.cards.get(self.position)
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn known(&self) -> &[VocabularyWord] {
        &self.known
    }

    pub fn unknown(&self) -> &[VocabularyWord] {
        &self.unknown
    }

    /// Fraction of the deck reached so far, in (0, 1]
    pub fn progress(&self) -> f64 {
        if self.cards.is_empty() {
            return 1.0;
        }
        (self.position + 1) as f64 / self.cards.len() as f64
    }

    /// Judge the current card and move on. Returns the judged word, or
    /// `None` when the deck has nothing left to judge.
    pub fn mark(&mut self, judgment: Judgment, now: DateTime<Utc>) -> Option<VocabularyWord> {
        let mut word = self.current()?.clone();
        word.last_studied = Some(now);

        self.known.retain(|w| w.id != word.id);
        self.unknown.retain(|w| w.id != word.id);
        match judgment {
            Judgment::Known => self.known.push(word.clone()),
            Judgment::Unknown => self.unknown.push(word.clone()),
        }

        if self.position + 1 >= self.cards.len() {
            self.finished = true;
        } else {
            self.position += 1;
        }
        Some(word)
    }

    /// Step back one card. Returns false at the first card.
    pub fn previous(&mut self) -> bool {
        if self.position == 0 || self.finished {
            return false;
        }
        self.position -= 1;
        true
    }

    /// Take a card out of the deck, dropping any judgment already made on
    /// it. Removing the last unjudged card finishes the deck. Returns false
    /// when the id is not in the deck.
    pub fn remove(&mut self, word_id: &str) -> bool {
        let Some(index) = self.cards.iter().position(|w| w.id == word_id) else {
            return false;
        };
        self.cards.remove(index);
        self.known.retain(|w| w.id != word_id);
        self.unknown.retain(|w| w.id != word_id);

        if index < self.position {
            self.position -= 1;
        } else if self.position >= self.cards.len() {
            self.position = self.cards.len().saturating_sub(1);
            self.finished = true;
        }
        true
    }

    pub fn finish(self) -> StudyOutcome {
        StudyOutcome {
            known: self.known,
            unknown: self.unknown,
        }
    }
}

/// The words offered before a learner has built a study list
pub fn default_pool() -> Vec<PoolWord> {
    const POOL: [(&str, &str, &str, &str, Difficulty); 10] = [
        ("1", "abandon", "見捨てる、放棄する", "He had to abandon his car in the flood.", Difficulty::Intermediate),
        ("2", "ability", "能力、才能", "She has the ability to learn languages quickly.", Difficulty::Beginner),
        ("3", "above", "～の上に、以上の", "The temperature is above average for this time of year.", Difficulty::Beginner),
        ("4", "abroad", "海外に、外国で", "She's currently studying abroad in France.", Difficulty::Beginner),
        ("5", "absolute", "絶対的な、完全な", "I have absolute confidence in her abilities.", Difficulty::Intermediate),
        ("6", "academic", "学問の、大学の", "His academic achievements were impressive.", Difficulty::Intermediate),
        ("7", "accept", "受け入れる、承諾する", "She accepted their offer of employment.", Difficulty::Beginner),
        ("8", "access", "アクセス、接近", "You need a password to access the system.", Difficulty::Intermediate),
        ("9", "accident", "事故、偶然", "He was involved in a car accident last week.", Difficulty::Beginner),
        ("10", "accommodate", "収容する、対応する", "The hotel can accommodate up to 500 guests.", Difficulty::Advanced),
    ];

    POOL.iter()
        .map(|(id, word, translation, example, level)| PoolWord {
            word: VocabularyWord::new(*id, *word, *translation, Some(example.to_string())),
            level: *level,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn word(id: &str) -> VocabularyWord {
        VocabularyWord::new(id, format!("w{id}"), format!("t{id}"), None)
    }

    fn level_of(pool: &[PoolWord], id: &str) -> Difficulty {
        pool.iter().find(|p| p.word.id == id).unwrap().level
    }

    #[test]
    fn test_beginner_selection_excludes_known() {
        let pool = default_pool();
        let known = vec![word("1")];
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let set = select_study_set(&[], &known, &pool, 5, StudyLimits::default(), &mut rng);

        assert!(set.len() <= 10);
        assert!(!set.is_empty());
        assert!(set.iter().all(|w| w.id != "1"));
        assert!(set
            .iter()
            .all(|w| level_of(&pool, &w.id) == Difficulty::Beginner));
    }

    #[test]
    fn test_intermediate_ceiling() {
        let pool = default_pool();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let set = select_study_set(&[], &[], &pool, 15, StudyLimits::default(), &mut rng);
        assert_eq!(set.len(), 9);
        assert!(set.iter().all(|w| w.id != "10"));
    }

    #[test]
    fn test_advanced_level_gets_everything() {
        let pool = default_pool();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let set = select_study_set(&[], &[], &pool, 20, StudyLimits::default(), &mut rng);
        assert_eq!(set.len(), 10);
        let ids: HashSet<&str> = set.iter().map(|w| w.id.as_str()).collect();
        assert_eq!(ids.len(), 10);
    }

    #[test]
    fn test_sample_respects_limit() {
        let pool = default_pool();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let limits = StudyLimits {
            pool_sample: 3,
            study_cap: 50,
        };
        let set = select_study_set(&[], &[], &pool, 30, limits, &mut rng);
        assert_eq!(set.len(), 3);
    }

    #[test]
    fn test_study_list_returned_in_order_and_capped() {
        let study: Vec<VocabularyWord> = (0..60).map(|i| word(&format!("s{i}"))).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        let set = select_study_set(
            &study,
            &[],
            &default_pool(),
            1,
            StudyLimits::default(),
            &mut rng,
        );
        assert_eq!(set.len(), 50);
        assert_eq!(set[0].id, "s0");
        assert_eq!(set[49].id, "s49");
    }

    #[test]
    fn test_known_then_unknown_lands_in_unknown_only() {
        let mut deck = StudyDeck::new(vec![word("a"), word("b")]);
        let now = Utc::now();

        deck.mark(Judgment::Known, now);
        assert!(deck.previous());
        deck.mark(Judgment::Unknown, now);

        assert!(deck.known().iter().all(|w| w.id != "a"));
        assert_eq!(deck.unknown().iter().filter(|w| w.id == "a").count(), 1);
        assert!(!deck.is_finished());
    }

    #[test]
    fn test_deck_finishes_at_end() {
        let mut deck = StudyDeck::new(vec![word("a"), word("b")]);
        let now = Utc::now();
        deck.mark(Judgment::Known, now);
        let judged = deck.mark(Judgment::Unknown, now).unwrap();
        assert_eq!(judged.id, "b");
        assert_eq!(judged.last_studied, Some(now));
        assert!(deck.is_finished());
        assert!(deck.current().is_none());
        assert!(deck.mark(Judgment::Known, now).is_none());

        let outcome = deck.finish();
        assert_eq!(outcome.known.len(), 1);
        assert_eq!(outcome.known[0].id, "a");
        assert_eq!(outcome.unknown[0].id, "b");
    }

    #[test]
    fn test_remove_current_card_keeps_position() {
        let mut deck = StudyDeck::new(vec![word("a"), word("b"), word("c")]);
        let now = Utc::now();
        deck.mark(Judgment::Known, now);

        assert!(deck.remove("b"));
        assert_eq!(deck.len(), 2);
        assert_eq!(deck.position(), 1);
        assert_eq!(deck.current().map(|w| w.id.as_str()), Some("c"));
        assert!(!deck.remove("b"));
    }

    #[test]
    fn test_remove_judged_card_drops_judgment() {
        let mut deck = StudyDeck::new(vec![word("a"), word("b"), word("c")]);
        let now = Utc::now();
        deck.mark(Judgment::Known, now);
        deck.mark(Judgment::Unknown, now);

        assert!(deck.remove("a"));
        assert_eq!(deck.position(), 1);
        assert_eq!(deck.current().map(|w| w.id.as_str()), Some("c"));
        assert!(deck.known().is_empty());
        assert_eq!(deck.unknown().len(), 1);
    }

    #[test]
    fn test_remove_last_pending_card_finishes_deck() {
        let mut deck = StudyDeck::new(vec![word("a"), word("b")]);
        deck.mark(Judgment::Known, Utc::now());

        assert!(deck.remove("b"));
        assert!(deck.is_finished());
        assert_eq!(deck.finish().known.len(), 1);

        let mut single = StudyDeck::new(vec![word("a")]);
        assert!(single.remove("a"));
        assert!(single.is_finished());
        assert!(single.is_empty());
    }

    #[test]
    fn test_empty_deck_is_finished() {
        let deck = StudyDeck::new(Vec::new());
        assert!(deck.is_finished());
        assert_eq!(deck.progress(), 1.0);
    }

    #[test]
    fn test_previous_at_start() {
        let mut deck = StudyDeck::new(vec![word("a")]);
        assert!(!deck.previous());
    }
}
