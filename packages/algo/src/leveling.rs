//! Leveling Calculator
//!
//! Experience is accumulated in whole points. Every 100 points is one level,
//! starting at level 1. Milestone titles change every ten levels.

use serde::{Deserialize, Serialize};

/// Experience needed to advance one level
pub const EXPERIENCE_PER_LEVEL: u64 = 100;

/// Granted for every turn that produced an assistant reply
pub const TURN_EXPERIENCE: u64 = 10;

/// Granted per correction included in a reply
pub const CORRECTION_EXPERIENCE: u64 = 2;

/// Granted per word newly marked known in a study session
pub const STUDY_WORD_EXPERIENCE: u64 = 5;

const LEVELS_PER_TITLE: u32 = 10;

const LEVEL_TITLES: [&str; 10] = [
    "英語？食べられるの？",
    "Hello と言った後、頭が真っ白",
    "道を尋ねたら、答えが長すぎて絶望",
    "外国人との会話、7割は頷くだけ",
    "映画は字幕ありでほぼ理解",
    "海外ドラマ、たまに字幕なしでも笑える",
    "英語での電話、もう震えない",
    "友達から通訳を頼まれがち",
    "英語で冗談を言って笑いを取れる",
    "英語を話すとき、もう母国語を忘れる",
];

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelProgress {
    /// Always >= 1
    pub level: u32,
    /// Fraction of the current level completed, in [0, 1)
    pub progress_fraction: f64,
}

pub fn level_of(experience: u64) -> LevelProgress {
    LevelProgress {
        level: level_number(experience),
        progress_fraction: xp_in_level(experience) as f64 / EXPERIENCE_PER_LEVEL as f64,
    }
}

pub fn level_number(experience: u64) -> u32 {
    let level = experience / EXPERIENCE_PER_LEVEL + 1;
    u32::try_from(level).unwrap_or(u32::MAX)
}

pub fn xp_in_level(experience: u64) -> u64 {
    experience % EXPERIENCE_PER_LEVEL
}

pub fn xp_to_next_level(experience: u64) -> u64 {
    EXPERIENCE_PER_LEVEL - xp_in_level(experience)
}

/// Experience earned by one successful conversational turn
pub fn turn_experience(corrections: usize) -> u64 {
    TURN_EXPERIENCE + CORRECTION_EXPERIENCE * corrections as u64
}

/// Experience earned by a study session
pub fn study_experience(newly_known: usize) -> u64 {
    STUDY_WORD_EXPERIENCE * newly_known as u64
}

/// Milestone title for a level; levels 1-10 share the first title and
/// everything past 90 keeps the last one.
pub fn level_title(level: u32) -> &'static str {
    let block = level.max(1).div_ceil(LEVELS_PER_TITLE) as usize;
    let index = block.clamp(1, LEVEL_TITLES.len()) - 1;
    LEVEL_TITLES[index]
}

pub fn leveled_up(experience_before: u64, experience_after: u64) -> bool {
    level_number(experience_after) > level_number(experience_before)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_of_zero() {
        let progress = level_of(0);
        assert_eq!(progress.level, 1);
        assert_eq!(progress.progress_fraction, 0.0);
    }

    #[test]
    fn test_level_boundaries() {
        assert_eq!(level_of(99).level, 1);
        assert_eq!(level_of(100).level, 2);
        assert_eq!(level_of(250).level, 3);
        assert!((level_of(250).progress_fraction - 0.5).abs() < 1e-9);
        assert!((level_of(99).progress_fraction - 0.99).abs() < 1e-9);
    }

    #[test]
    fn test_xp_to_next_level() {
        assert_eq!(xp_to_next_level(0), 100);
        assert_eq!(xp_to_next_level(130), 70);
        assert_eq!(xp_in_level(130), 30);
    }

    #[test]
    fn test_experience_rules() {
        assert_eq!(turn_experience(0), 10);
        assert_eq!(turn_experience(3), 16);
        assert_eq!(study_experience(4), 20);
    }

    #[test]
    fn test_level_titles_change_every_ten_levels() {
        assert_eq!(level_title(1), LEVEL_TITLES[0]);
        assert_eq!(level_title(10), LEVEL_TITLES[0]);
        assert_eq!(level_title(11), LEVEL_TITLES[1]);
        assert_eq!(level_title(95), LEVEL_TITLES[9]);
        assert_eq!(level_title(400), LEVEL_TITLES[9]);
        assert_eq!(level_title(0), LEVEL_TITLES[0]);
    }

    #[test]
    fn test_leveled_up() {
        assert!(leveled_up(95, 105));
        assert!(!leveled_up(100, 199));
    }
}
