use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use fitbot_utils::time::day_before;

use crate::badges::{BadgeAward, BadgeFacts, BadgeRule, DEFAULT_BADGE_RULES, evaluate_badges};
use crate::leveling::LevelLadder;
use crate::model::{Profile, TurnEvents};

/// Fixed experience granted per logged event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardTable {
    pub workout: u32,
    pub meal: u32,
    pub goal: u32,
}

pub const DEFAULT_REWARDS: RewardTable = RewardTable {
    workout: 50,
    meal: 20,
    goal: 25,
};

/// Bonus of `per_day * streak`, capped at `cap`, added to turns that earned experience.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreakBonus {
    pub per_day: u32,
    pub cap: u32,
}

pub const DEFAULT_STREAK_BONUS: StreakBonus = StreakBonus {
    per_day: 5,
    cap: 25,
};

impl StreakBonus {
    pub fn for_streak(&self, streak: u32) -> u32 {
        streak.saturating_mul(self.per_day).min(self.cap)
    }
}

/// All tunable gamification constants in one place.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GamificationConfig {
    pub rewards: RewardTable,
    pub streak_bonus: StreakBonus,
    pub ladder: LevelLadder,
    pub badge_rules: Vec<BadgeRule>,
}

impl Default for GamificationConfig {
    fn default() -> Self {
        Self {
            rewards: DEFAULT_REWARDS,
            streak_bonus: DEFAULT_STREAK_BONUS,
            ladder: LevelLadder::default(),
            badge_rules: DEFAULT_BADGE_RULES.to_vec(),
        }
    }
}

/// Deterministic result of applying one turn's events to a profile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnProgress {
    pub experience_gained: u64,
    pub previous_level: u32,
    pub leveled_up: bool,
    pub award: BadgeAward,
    pub profile: Profile,
}

impl GamificationConfig {
    /// Base rewards for the events present plus the streak bonus, or zero when nothing was logged.
    pub fn experience_for(&self, events: &TurnEvents, previous_streak: u32) -> u64 {
        let mut base = 0_u64;
        if events.workout.is_some() {
            base += u64::from(self.rewards.workout);
        }
        if events.meal.is_some() {
            base += u64::from(self.rewards.meal);
        }
        if events.goal.is_some() {
            base += u64::from(self.rewards.goal);
        }

        if base == 0 {
            return 0;
        }

        base + u64::from(self.streak_bonus.for_streak(previous_streak))
    }

    /// Apply a turn to `profile` as of `today`. The input's level is ignored in
    /// favour of the level derived from its total experience.
    pub fn settle_turn(&self, profile: &Profile, events: &TurnEvents, today: NaiveDate) -> TurnProgress {
        let previous_level = self.ladder.level_for(profile.total_xp);
        let experience_gained = self.experience_for(events, profile.current_streak);
        let earned = experience_gained > 0;

        let current_streak = if earned {
            next_streak(profile.current_streak, profile.last_active, today)
        } else {
            profile.current_streak
        };
        let last_active = if earned {
            Some(today)
        } else {
            profile.last_active
        };

        let total_xp = profile.total_xp.saturating_add(experience_gained);
        let level = self.ladder.level_for(total_xp);

        let award = evaluate_badges(
            &self.badge_rules,
            &profile.badges,
            &BadgeFacts {
                workout_logged: events.workout.is_some(),
                meal_logged: events.meal.is_some(),
                goal_set: events.goal.is_some(),
                streak: current_streak,
                level,
            },
        );

        TurnProgress {
            experience_gained,
            previous_level,
            leveled_up: level > previous_level,
            profile: Profile {
                user_id: profile.user_id.clone(),
                display_name: profile.display_name.clone(),
                level,
                total_xp,
                current_streak,
                last_active,
                badges: award.badges.clone(),
            },
            award,
        }
    }
}

/// Streak after an experience-earning turn on `today`.
///
/// Activity on the previous day extends the streak; anything else, including
/// an earlier active turn today, restarts it at one.
pub fn next_streak(previous: u32, last_active: Option<NaiveDate>, today: NaiveDate) -> u32 {
    match last_active {
        Some(date) if date == day_before(today) => previous.saturating_add(1),
        _ => 1,
    }
}
