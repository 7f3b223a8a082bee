//! XP curve and quest rewards.
//!
//! Shared by the client (reward previews, progress bars) and the local
//! store (awarding). Every step is iterated with the same float
//! arithmetic on both sides so previews and grants never drift apart.

use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::models::{SubjectId, SubjectProgress};

const BASE_LEVEL_XP: u64 = 100;
const LEVEL_GROWTH: f64 = 1.2;
const BASE_QUEST_XP: u64 = 10;
const QUEST_XP_GROWTH: f64 = 1.15;
const BASE_CREDITS: u64 = 5;
const CREDIT_GROWTH: f64 = 1.1;

/// Rows shown on the help screen.
pub const HELP_TABLE_LEVELS: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressionConfig {
    pub base_level_xp: u64,
    pub level_growth: f64,
    pub base_quest_xp: u64,
    pub quest_xp_growth: f64,
    pub base_credits: u64,
    pub credit_growth: f64,
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        Self {
            base_level_xp: BASE_LEVEL_XP,
            level_growth: LEVEL_GROWTH,
            base_quest_xp: BASE_QUEST_XP,
            quest_xp_growth: QUEST_XP_GROWTH,
            base_credits: BASE_CREDITS,
            credit_growth: CREDIT_GROWTH,
        }
    }
}

/// Read-only display values for one subject.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectView {
    pub subject_id: SubjectId,
    pub level: u32,
    pub total_xp: u64,
    /// Raw, may be negative for an inconsistent snapshot.
    pub current_level_xp: i64,
    pub level_span: u64,
    /// Clamped to 0.0..=1.0
    pub progress: f32,
    pub credits: u64,
    pub quests_completed: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelRow {
    pub level: u32,
    pub total_xp: u64,
    pub level_xp: u64,
    pub quest_xp: u64,
    pub quests_needed: u64,
}

impl ProgressionConfig {
    /// Total XP needed to have reached `level`.
    ///
    /// The running increment stays unfloored; each step adds its floor.
    pub fn cumulative_xp_requirement(&self, level: u32) -> u64 {
        if level <= 1 {
            return 0;
        }
        let mut total = self.base_level_xp;
        let mut increment = self.base_level_xp as f64;
        for _ in 2..level {
            increment *= self.level_growth;
            total = total.saturating_add(increment.floor() as u64);
        }
        total
    }

    /// XP needed to go from `level` to `level + 1`.
    pub fn level_span(&self, level: u32) -> u64 {
        self.cumulative_xp_requirement(level.saturating_add(1))
            .saturating_sub(self.cumulative_xp_requirement(level))
    }

    /// XP earned inside the current level. Not clamped.
    pub fn current_level_xp(&self, total_xp: u64, level: u32) -> i64 {
        let floor = self.cumulative_xp_requirement(level);
        clamp_i64(total_xp as i128 - floor as i128)
    }

    /// 0.0..1.0 progress within the current level
    pub fn progress_ratio(&self, total_xp: u64, level: u32) -> f32 {
        let span = self.level_span(level);
        if span == 0 {
            return 0.0;
        }
        let ratio = self.current_level_xp(total_xp, level) as f64 / span as f64;
        ratio.clamp(0.0, 1.0) as f32
    }

    pub fn quest_xp_reward(&self, difficulty: u32) -> u64 {
        scaled_reward(self.base_quest_xp, self.quest_xp_growth, difficulty)
    }

    pub fn quest_credit_reward(&self, difficulty: u32) -> u64 {
        scaled_reward(self.base_credits, self.credit_growth, difficulty)
    }

    /// Highest level whose requirement is covered by `total_xp`.
    pub fn level_for_total_xp(&self, total_xp: u64) -> u32 {
        // walks the same curve as `cumulative_xp_requirement`, one step per level
        let mut level = 1;
        let mut next_floor = self.base_level_xp;
        let mut span = self.base_level_xp;
        let mut increment = self.base_level_xp as f64;
        while span > 0 && next_floor <= total_xp && level < u32::MAX {
            level += 1;
            increment *= self.level_growth;
            let floor = next_floor;
            next_floor = floor.saturating_add(increment.floor() as u64);
            span = next_floor - floor;
        }
        level
    }

    pub fn level_table(&self, max_level: u32) -> Vec<LevelRow> {
        (1..=max_level)
            .map(|level| {
                let total_xp = self.cumulative_xp_requirement(level);
                let level_xp = total_xp - self.cumulative_xp_requirement(level - 1);
                let quest_xp = self.quest_xp_reward(level);
                let quests_needed = if quest_xp == 0 {
                    0
                } else {
                    level_xp.div_ceil(quest_xp)
                };
                LevelRow {
                    level,
                    total_xp,
                    level_xp,
                    quest_xp,
                    quests_needed,
                }
            })
            .collect()
    }

    pub fn subject_view(&self, progress: &SubjectProgress) -> SubjectView {
        SubjectView {
            subject_id: progress.subject_id.clone(),
            level: progress.level,
            total_xp: progress.total_xp,
            current_level_xp: self.current_level_xp(progress.total_xp, progress.level),
            level_span: self.level_span(progress.level),
            progress: self.progress_ratio(progress.total_xp, progress.level),
            credits: progress.credits,
            quests_completed: progress.quests_completed,
        }
    }

    /// Reports XP below the level floor instead of hiding it.
    pub fn check_consistency(&self, progress: &SubjectProgress) -> Result<(), ClientError> {
        if self.current_level_xp(progress.total_xp, progress.level) < 0 {
            return Err(ClientError::InconsistentProfile {
                subject: progress.subject_id.clone(),
                level: progress.level,
                total_xp: progress.total_xp,
                level_floor: self.cumulative_xp_requirement(progress.level),
            });
        }
        Ok(())
    }
}

/// base * growth^(difficulty - 1), multiplied step by step, floored once.
fn scaled_reward(base: u64, growth: f64, difficulty: u32) -> u64 {
    let mut amount = base as f64;
    for _ in 1..difficulty.max(1) {
        amount *= growth;
    }
    amount.floor() as u64
}

fn clamp_i64(value: i128) -> i64 {
    value.clamp(i64::MIN as i128, i64::MAX as i128) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const REQUIRED_XP: [u64; 20] = [
        0, 100, 220, 364, 536, 743, 991, 1289, 1647, 2076, 2591, 3210, 3953, 4844, 5913, 7196,
        8736, 10584, 12802, 15464,
    ];

    fn curve() -> ProgressionConfig {
        ProgressionConfig::default()
    }

    #[test]
    fn test_level_one_is_free() {
        assert_eq!(curve().cumulative_xp_requirement(1), 0);
        assert_eq!(curve().cumulative_xp_requirement(0), 0);
    }

    #[test]
    fn test_floor_per_step() {
        let c = curve();
        assert_eq!(c.cumulative_xp_requirement(2), 100);
        assert_eq!(c.cumulative_xp_requirement(3), 220); // 100 + 120
        assert_eq!(c.cumulative_xp_requirement(4), 364); // 220 + 144
        assert_eq!(c.cumulative_xp_requirement(5), 536); // 364 + floor(172.8)
    }

    #[test]
    fn test_reference_table() {
        let c = curve();
        for (i, expected) in REQUIRED_XP.iter().enumerate() {
            assert_eq!(c.cumulative_xp_requirement(i as u32 + 1), *expected, "level {}", i + 1);
        }
    }

    #[test]
    fn test_level_span_matches_difference() {
        let c = curve();
        for level in 1..=20 {
            assert_eq!(
                c.level_span(level),
                c.cumulative_xp_requirement(level + 1) - c.cumulative_xp_requirement(level)
            );
        }
        assert_eq!(c.level_span(1), 100);
        assert_eq!(c.level_span(4), 172);
    }

    #[test]
    fn test_quest_xp_reward() {
        let c = curve();
        assert_eq!(c.quest_xp_reward(1), 10);
        assert_eq!(c.quest_xp_reward(2), 11); // floor(11.5)
        assert_eq!(c.quest_xp_reward(3), 13); // floor(13.225)
        assert_eq!(c.quest_xp_reward(10), 35);
        assert_eq!(c.quest_xp_reward(0), 10);
    }

    #[test]
    fn test_quest_credit_reward() {
        let c = curve();
        let credits: Vec<u64> = (1..=10).map(|d| c.quest_credit_reward(d)).collect();
        assert_eq!(credits, vec![5, 5, 6, 6, 7, 8, 8, 9, 10, 11]);
    }

    #[test]
    fn test_current_level_xp_not_clamped() {
        let c = curve();
        assert_eq!(c.current_level_xp(250, 3), 30);
        assert_eq!(c.current_level_xp(150, 3), -70);
    }

    #[test]
    fn test_progress_ratio() {
        let c = curve();
        assert!((c.progress_ratio(0, 1) - 0.0).abs() < f32::EPSILON);
        assert!((c.progress_ratio(50, 1) - 0.5).abs() < 0.01);
        assert!((c.progress_ratio(292, 3) - 0.5).abs() < 0.01); // 72 / 144
    }

    #[test]
    fn test_progress_ratio_clamped() {
        let c = curve();
        assert_eq!(c.progress_ratio(10, 3), 0.0);
        assert_eq!(c.progress_ratio(5_000, 2), 1.0);
    }

    #[test]
    fn test_level_for_total_xp() {
        let c = curve();
        assert_eq!(c.level_for_total_xp(0), 1);
        assert_eq!(c.level_for_total_xp(99), 1);
        assert_eq!(c.level_for_total_xp(100), 2);
        assert_eq!(c.level_for_total_xp(219), 2);
        assert_eq!(c.level_for_total_xp(220), 3);
        assert_eq!(c.level_for_total_xp(15_464), 20);
    }

    #[test]
    fn test_level_for_total_xp_matches_curve_scan() {
        let scan = |c: &ProgressionConfig, total_xp: u64| {
            let mut level = 1;
            while c.level_span(level) > 0 && c.cumulative_xp_requirement(level + 1) <= total_xp {
                level += 1;
            }
            level
        };
        let steep = ProgressionConfig {
            base_level_xp: 7,
            level_growth: 1.37,
            ..ProgressionConfig::default()
        };
        for c in [curve(), steep] {
            for total_xp in [0, 6, 7, 100, 363, 364, 5_000, 1_000_000, u64::MAX / 2, u64::MAX] {
                assert_eq!(c.level_for_total_xp(total_xp), scan(&c, total_xp), "{}", total_xp);
            }
        }
    }

    #[test]
    fn test_level_table() {
        let table = curve().level_table(HELP_TABLE_LEVELS);
        assert_eq!(table.len(), 20);
        assert_eq!(
            table[0],
            LevelRow { level: 1, total_xp: 0, level_xp: 0, quest_xp: 10, quests_needed: 0 }
        );
        assert_eq!(
            table[1],
            LevelRow { level: 2, total_xp: 100, level_xp: 100, quest_xp: 11, quests_needed: 10 }
        );
        assert_eq!(table[19].quests_needed, 19); // ceil(2662 / 142)
    }

    #[test]
    fn test_consistency_check() {
        let c = curve();
        let mut progress = SubjectProgress::new(SubjectId::from("math"));
        progress.level = 3;
        progress.total_xp = 230;
        assert!(c.check_consistency(&progress).is_ok());

        progress.total_xp = 150;
        let err = c.check_consistency(&progress).unwrap_err();
        assert_eq!(
            err,
            ClientError::InconsistentProfile {
                subject: SubjectId::from("math"),
                level: 3,
                total_xp: 150,
                level_floor: 220,
            }
        );
    }

    #[test]
    fn test_subject_view_keeps_negative_xp() {
        let c = curve();
        let mut progress = SubjectProgress::new(SubjectId::from("math"));
        progress.level = 4;
        progress.total_xp = 300;
        let view = c.subject_view(&progress);
        assert_eq!(view.current_level_xp, -64);
        assert_eq!(view.level_span, 172);
        assert_eq!(view.progress, 0.0);
    }

    #[test]
    fn test_custom_curve() {
        let c = ProgressionConfig {
            base_level_xp: 50,
            level_growth: 2.0,
            ..ProgressionConfig::default()
        };
        assert_eq!(c.cumulative_xp_requirement(4), 50 + 100 + 200);
    }

    proptest! {
        #[test]
        fn prop_requirement_non_decreasing(level in 1u32..200) {
            let c = curve();
            prop_assert!(c.cumulative_xp_requirement(level + 1) >= c.cumulative_xp_requirement(level));
        }

        #[test]
        fn prop_requirement_is_pure(level in 1u32..100, other in 1u32..100) {
            let c = curve();
            let first = c.cumulative_xp_requirement(level);
            let _ = c.cumulative_xp_requirement(other);
            prop_assert_eq!(first, c.cumulative_xp_requirement(level));
        }

        #[test]
        fn prop_progress_ratio_in_unit_interval(total_xp in 0u64..1_000_000, level in 1u32..60) {
            let ratio = curve().progress_ratio(total_xp, level);
            prop_assert!((0.0..=1.0).contains(&ratio));
        }

        #[test]
        fn prop_quest_rewards_non_decreasing(difficulty in 1u32..60) {
            let c = curve();
            prop_assert!(c.quest_xp_reward(difficulty + 1) >= c.quest_xp_reward(difficulty));
            prop_assert!(c.quest_credit_reward(difficulty + 1) >= c.quest_credit_reward(difficulty));
        }

        #[test]
        fn prop_level_for_total_xp_brackets(total_xp in 0u64..100_000) {
            let c = curve();
            let level = c.level_for_total_xp(total_xp);
            prop_assert!(c.cumulative_xp_requirement(level) <= total_xp);
            prop_assert!(c.cumulative_xp_requirement(level + 1) > total_xp);
        }
    }
}
