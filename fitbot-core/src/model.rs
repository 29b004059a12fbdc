use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Display name used in the coach prompt when the profile has none.
pub const DEFAULT_DISPLAY_NAME: &str = "Athlete";

/// User id assumed when a chat request omits one.
pub const DEFAULT_USER_ID: &str = "user_default";

/// Category used when a tag omits `type`.
pub const DEFAULT_EVENT_KIND: &str = "general";

/// Primary key of a stored profile row.
pub type ProfileRecordId = i64;

/// Gamification state of one user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: String,
    pub display_name: String,
    pub level: u32,
    pub total_xp: u64,
    pub current_streak: u32,
    pub last_active: Option<NaiveDate>,
    pub badges: Vec<String>,
}

impl Profile {
    /// Starting state for a user with no stored record.
    pub fn new_default(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: DEFAULT_DISPLAY_NAME.to_owned(),
            level: 1,
            total_xp: 0,
            current_streak: 0,
            last_active: None,
            badges: Vec::new(),
        }
    }

    pub fn snapshot(&self) -> ProfileSnapshot {
        ProfileSnapshot {
            level: self.level,
            total_xp: self.total_xp,
            current_streak: self.current_streak,
            badges: self.badges.clone(),
        }
    }
}

/// A profile as returned by the profile store, with its record id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredProfile {
    pub record_id: ProfileRecordId,
    pub profile: Profile,
}

/// Columns written back after a turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub level: u32,
    pub total_xp: u64,
    pub current_streak: u32,
    pub last_active: Option<NaiveDate>,
    pub badges: Vec<String>,
}

impl From<&Profile> for ProfileUpdate {
    fn from(profile: &Profile) -> Self {
        Self {
            level: profile.level,
            total_xp: profile.total_xp,
            current_streak: profile.current_streak,
            last_active: profile.last_active,
            badges: profile.badges.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkoutEvent {
    pub kind: String,
    pub duration_minutes: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MealEvent {
    pub kind: String,
    pub calories: u32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GoalEvent {
    pub kind: String,
    pub description: String,
}

/// Events extracted from one reply; at most one per category.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TurnEvents {
    pub workout: Option<WorkoutEvent>,
    pub meal: Option<MealEvent>,
    pub goal: Option<GoalEvent>,
}

impl TurnEvents {
    pub fn is_empty(&self) -> bool {
        self.workout.is_none() && self.meal.is_none() && self.goal.is_none()
    }

    pub fn count(&self) -> usize {
        usize::from(self.workout.is_some())
            + usize::from(self.meal.is_some())
            + usize::from(self.goal.is_some())
    }
}

/// Row appended to the workout log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkoutLogEntry {
    pub user_id: String,
    pub date: NaiveDate,
    pub kind: String,
    pub details: String,
    pub duration_minutes: u32,
    pub xp_earned: u32,
}

/// Row appended to the nutrition log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MealLogEntry {
    pub user_id: String,
    pub date: NaiveDate,
    pub meal: String,
    pub description: String,
    pub calories: u32,
    pub xp_earned: u32,
}

/// Aggregate of logged workouts for one workout type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutTotal {
    pub sessions: u64,
    pub minutes: u64,
}

/// Row appended to the goal list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GoalEntry {
    pub user_id: String,
    pub goal_type: String,
    pub description: String,
    pub status: String,
    pub xp_reward: u32,
}

/// One chat message sent by a user.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    #[serde(default = "default_user_id")]
    pub user_id: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub message: String,
}

fn default_user_id() -> String {
    DEFAULT_USER_ID.to_owned()
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub name: String,
    pub icon: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSnapshot {
    pub level: u32,
    #[serde(rename = "totalXP")]
    pub total_xp: u64,
    #[serde(rename = "currentStreak")]
    pub current_streak: u32,
    pub badges: Vec<String>,
}

/// Everything the presentation layer needs after a turn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOutcome {
    #[serde(rename = "message")]
    pub display_message: String,
    #[serde(rename = "xpGained")]
    pub experience_gained: u64,
    #[serde(rename = "levelUp")]
    pub leveled_up: bool,
    #[serde(rename = "newAchievement")]
    pub new_badge: Option<Achievement>,
    pub profile: ProfileSnapshot,
}
