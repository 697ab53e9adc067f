//! Progress aggregate
//!
//! Per-learner practice statistics. Counters only move through the update
//! operations below; a persisted record is loaded once with [`ProgressState::restore`].

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::leveling::{self, LevelProgress};
use crate::types::VocabularyWord;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VocabularyError {
    #[error("word {0} is already in the vocabulary")]
    Duplicate(String),
    #[error("word text must not be empty")]
    EmptyWord,
}

/// The persisted counters of a progress record
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressCounters {
    pub total_turns: u64,
    pub corrected_turns: u64,
    pub vocabulary_learned: u64,
    pub last_practiced: Option<DateTime<Utc>>,
    pub streak: u32,
    pub experience: u64,
}

/// What an update changed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressDelta {
    pub experience_gained: u64,
    pub leveled_up: bool,
    pub level: u32,
}

/// Serializable view handed to clients
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub total_turns: u64,
    pub corrected_turns: u64,
    pub vocabulary_learned: u64,
    pub last_practiced: Option<DateTime<Utc>>,
    pub streak: u32,
    pub level: u32,
    pub experience: u64,
    pub level_progress: f64,
    pub xp_in_level: u64,
    pub xp_to_next_level: u64,
    pub title: String,
    pub known_vocabulary: Vec<VocabularyWord>,
    pub study_vocabulary: Vec<VocabularyWord>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ProgressState {
    counters: ProgressCounters,
    known_vocabulary: Vec<VocabularyWord>,
    study_vocabulary: Vec<VocabularyWord>,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressState {
    pub fn new() -> Self {
        Self {
            counters: ProgressCounters::default(),
            known_vocabulary: Vec::new(),
            study_vocabulary: Vec::new(),
        }
    }

    /// Rebuild from a persisted record. Words are partitioned by their
    /// `mastered` flag; a word id appearing twice keeps its first placement.
    pub fn restore(counters: ProgressCounters, words: Vec<VocabularyWord>) -> Self {
        let mut seen = HashSet::new();
        let mut known_vocabulary = Vec::new();
        let mut study_vocabulary = Vec::new();
        for word in words {
            if !seen.insert(word.id.clone()) {
                continue;
            }
            if word.mastered {
                known_vocabulary.push(word);
            } else {
                study_vocabulary.push(word);
            }
        }
        Self {
            counters,
            known_vocabulary,
            study_vocabulary,
        }
    }

    pub fn counters(&self) -> &ProgressCounters {
        &self.counters
    }

    pub fn experience(&self) -> u64 {
        self.counters.experience
    }

    pub fn level(&self) -> u32 {
        leveling::level_number(self.counters.experience)
    }

    pub fn level_progress(&self) -> LevelProgress {
        leveling::level_of(self.counters.experience)
    }

    pub fn streak(&self) -> u32 {
        self.counters.streak
    }

    pub fn known_vocabulary(&self) -> &[VocabularyWord] {
        &self.known_vocabulary
    }

    pub fn study_vocabulary(&self) -> &[VocabularyWord] {
        &self.study_vocabulary
    }

    /// Account for one turn that produced an assistant reply.
    pub fn record_turn(&mut self, corrections: usize, now: DateTime<Utc>) -> ProgressDelta {
        self.counters.total_turns += 1;
        if corrections > 0 {
            self.counters.corrected_turns += 1;
        }
        self.touch(now);
        self.gain(leveling::turn_experience(corrections))
    }

    /// Fold the `known` bucket of a finished study session into the
    /// aggregate. Only words not already known earn experience.
    pub fn complete_study(
        &mut self,
        known_words: Vec<VocabularyWord>,
        now: DateTime<Utc>,
    ) -> ProgressDelta {
        let mut newly_known = 0;
        for mut word in known_words {
            word.mastered = true;
            self.study_vocabulary.retain(|w| w.id != word.id);
            match self.known_vocabulary.iter_mut().find(|w| w.id == word.id) {
                Some(existing) => *existing = word,
                None => {
                    self.known_vocabulary.push(word);
                    newly_known += 1;
                }
            }
        }
        self.counters.vocabulary_learned = self.known_vocabulary.len() as u64;
        if newly_known > 0 {
            self.touch(now);
        }
        self.gain(leveling::study_experience(newly_known))
    }

    pub fn add_study_word(&mut self, mut word: VocabularyWord) -> Result<(), VocabularyError> {
        if word.word.trim().is_empty() {
            return Err(VocabularyError::EmptyWord);
        }
        if self.contains(&word.id) {
            return Err(VocabularyError::Duplicate(word.id));
        }
        word.mastered = false;
        self.study_vocabulary.push(word);
        Ok(())
    }

    pub fn remove_word(&mut self, word_id: &str) -> bool {
        let before = self.known_vocabulary.len() + self.study_vocabulary.len();
        self.known_vocabulary.retain(|w| w.id != word_id);
        self.study_vocabulary.retain(|w| w.id != word_id);
        let removed = before != self.known_vocabulary.len() + self.study_vocabulary.len();
        if removed {
            self.counters.vocabulary_learned = self.known_vocabulary.len() as u64;
        }
        removed
    }

    pub fn contains(&self, word_id: &str) -> bool {
        self.known_vocabulary
            .iter()
            .chain(self.study_vocabulary.iter())
            .any(|w| w.id == word_id)
    }

    /// Start over. Vocabulary lists are kept.
    pub fn reset(&mut self) {
        self.counters = ProgressCounters {
            vocabulary_learned: self.known_vocabulary.len() as u64,
            ..ProgressCounters::default()
        };
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        let experience = self.counters.experience;
        let level = self.level();
        ProgressSnapshot {
            total_turns: self.counters.total_turns,
            corrected_turns: self.counters.corrected_turns,
            vocabulary_learned: self.counters.vocabulary_learned,
            last_practiced: self.counters.last_practiced,
            streak: self.counters.streak,
            level,
            experience,
            level_progress: self.level_progress().progress_fraction,
            xp_in_level: leveling::xp_in_level(experience),
            xp_to_next_level: leveling::xp_to_next_level(experience),
            title: leveling::level_title(level).to_string(),
            known_vocabulary: self.known_vocabulary.clone(),
            study_vocabulary: self.study_vocabulary.clone(),
        }
    }

    fn gain(&mut self, experience: u64) -> ProgressDelta {
        let before = self.counters.experience;
        self.counters.experience = before.saturating_add(experience);
        ProgressDelta {
            experience_gained: experience,
            leveled_up: leveling::leveled_up(before, self.counters.experience),
            level: self.level(),
        }
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.counters.streak = next_streak(self.counters.last_practiced, self.counters.streak, now);
        self.counters.last_practiced = Some(now);
    }
}

/// Consecutive practice days, counted on the UTC calendar.
pub fn next_streak(last_practiced: Option<DateTime<Utc>>, streak: u32, now: DateTime<Utc>) -> u32 {
    let Some(last) = last_practiced else {
        return 1;
    };
    let days = (now.date_naive() - last.date_naive()).num_days();
    match days {
        d if d <= 0 => streak.max(1),
        1 => streak.saturating_add(1),
        _ => 1,
    }
}
