//! # kaiwa-algo - conversation-practice policies
//!
//! Pure Rust policies shared by the practice backend. Nothing here performs
//! I/O; callers supply clocks and random sources.
//!
//! ## Modules
//!
//! - [`leveling`] - experience to level, gain rules, milestone titles
//! - [`context`] - context window for generation requests, history trimming
//! - [`study`] - study set selection and the flashcard deck
//! - [`progress`] - the per-learner progress aggregate
//! - [`types`] - shared types and constants
//!
//! ## Example
//!
//! ```rust
//! use kaiwa_algo::{level_of, ProgressState};
//!
//! let mut progress = ProgressState::new();
//! progress.record_turn(1, chrono::Utc::now());
//! assert_eq!(progress.experience(), 12);
//! assert_eq!(level_of(progress.experience()).level, 1);
//! ```

pub mod context;
pub mod leveling;
pub mod progress;
pub mod study;
pub mod types;

pub use types::*;

pub use context::{build_window, trim_history, ContextWindow, FragmentKind, PromptFragment};

pub use leveling::{level_of, level_title, LevelProgress};

pub use progress::{
    ProgressCounters, ProgressDelta, ProgressSnapshot, ProgressState, VocabularyError,
};

pub use study::{default_pool, select_study_set, Judgment, StudyDeck, StudyLimits, StudyOutcome};
