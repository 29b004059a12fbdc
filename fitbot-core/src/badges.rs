use serde::{Deserialize, Serialize};

use crate::model::Achievement;

/// Icon shown for badge names outside the catalog.
pub const FALLBACK_BADGE_ICON: &str = "🏆";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Badge {
    FirstRep,
    FuelUp,
    GoalSetter,
    OnFire,
    WeekWarrior,
    IronWill,
    Level5,
    Level10,
}

impl Badge {
    pub const ALL: [Badge; 8] = [
        Badge::FirstRep,
        Badge::FuelUp,
        Badge::GoalSetter,
        Badge::OnFire,
        Badge::WeekWarrior,
        Badge::IronWill,
        Badge::Level5,
        Badge::Level10,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Badge::FirstRep => "First Rep",
            Badge::FuelUp => "Fuel Up",
            Badge::GoalSetter => "Goal Setter",
            Badge::OnFire => "On Fire",
            Badge::WeekWarrior => "Week Warrior",
            Badge::IronWill => "Iron Will",
            Badge::Level5 => "Level 5",
            Badge::Level10 => "Level 10",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Badge::FirstRep => "💪",
            Badge::FuelUp => "🥗",
            Badge::GoalSetter => "🎯",
            Badge::OnFire => "🔥",
            Badge::WeekWarrior => "⚡",
            Badge::IronWill => "🦾",
            Badge::Level5 => "⭐",
            Badge::Level10 => "🌟",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|badge| badge.name().eq_ignore_ascii_case(name.trim()))
    }

    pub fn achievement(self) -> Achievement {
        Achievement {
            name: self.name().to_owned(),
            icon: self.icon().to_owned(),
        }
    }
}

/// Icon for a stored badge name, falling back to a trophy for unknown names.
pub fn icon_for(name: &str) -> &'static str {
    Badge::from_name(name).map_or(FALLBACK_BADGE_ICON, Badge::icon)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BadgeCondition {
    WorkoutLogged,
    MealLogged,
    GoalSet,
    StreakAtLeast(u32),
    LevelAtLeast(u32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeRule {
    pub badge: Badge,
    pub condition: BadgeCondition,
}

/// Reference catalog, in evaluation order.
pub const DEFAULT_BADGE_RULES: [BadgeRule; 8] = [
    BadgeRule {
        badge: Badge::FirstRep,
        condition: BadgeCondition::WorkoutLogged,
    },
    BadgeRule {
        badge: Badge::FuelUp,
        condition: BadgeCondition::MealLogged,
    },
    BadgeRule {
        badge: Badge::GoalSetter,
        condition: BadgeCondition::GoalSet,
    },
    BadgeRule {
        badge: Badge::OnFire,
        condition: BadgeCondition::StreakAtLeast(3),
    },
    BadgeRule {
        badge: Badge::WeekWarrior,
        condition: BadgeCondition::StreakAtLeast(7),
    },
    BadgeRule {
        badge: Badge::IronWill,
        condition: BadgeCondition::StreakAtLeast(30),
    },
    BadgeRule {
        badge: Badge::Level5,
        condition: BadgeCondition::LevelAtLeast(5),
    },
    BadgeRule {
        badge: Badge::Level10,
        condition: BadgeCondition::LevelAtLeast(10),
    },
];

/// Post-turn facts the rules are checked against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BadgeFacts {
    pub workout_logged: bool,
    pub meal_logged: bool,
    pub goal_set: bool,
    pub streak: u32,
    pub level: u32,
}

impl BadgeCondition {
    pub fn holds(self, facts: &BadgeFacts) -> bool {
        match self {
            BadgeCondition::WorkoutLogged => facts.workout_logged,
            BadgeCondition::MealLogged => facts.meal_logged,
            BadgeCondition::GoalSet => facts.goal_set,
            BadgeCondition::StreakAtLeast(days) => facts.streak >= days,
            BadgeCondition::LevelAtLeast(level) => facts.level >= level,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BadgeAward {
    /// Full badge set after evaluation; existing entries keep their order.
    pub badges: Vec<String>,
    /// Badges added by this evaluation, in rule order.
    pub newly_earned: Vec<Badge>,
}

impl BadgeAward {
    /// The single badge surfaced to the user for this turn.
    pub fn highlight(&self) -> Option<Badge> {
        self.newly_earned.first().copied()
    }
}

/// Add every badge whose rule holds and that is not already held.
pub fn evaluate_badges(rules: &[BadgeRule], existing: &[String], facts: &BadgeFacts) -> BadgeAward {
    let mut badges = dedupe_badges(existing);
    let mut newly_earned = Vec::new();

    for rule in rules {
        if !rule.condition.holds(facts) {
            continue;
        }

        let name = rule.badge.name();
        if badges.iter().any(|held| held == name) {
            continue;
        }

        badges.push(name.to_owned());
        newly_earned.push(rule.badge);
    }

    BadgeAward {
        badges,
        newly_earned,
    }
}

/// Drop blank and repeated badge names, keeping first occurrences.
pub fn dedupe_badges(badges: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(badges.len());
    for badge in badges {
        let trimmed = badge.trim();
        if trimmed.is_empty() || out.iter().any(|held| held == trimmed) {
            continue;
        }
        out.push(trimmed.to_owned());
    }
    out
}
