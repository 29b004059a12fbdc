//! Collaborators the turn engine talks to. Implementations live in the
//! database and llm crates; tests use in-memory fakes.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::model::{
    GoalEntry, MealLogEntry, Profile, ProfileRecordId, ProfileUpdate, StoredProfile,
    WorkoutLogEntry, WorkoutTotal,
};

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// At most one profile per user id.
    async fn load_profile(&self, user_id: &str) -> anyhow::Result<Option<StoredProfile>>;

    async fn create_profile(&self, profile: &Profile) -> anyhow::Result<ProfileRecordId>;

    async fn update_profile(
        &self,
        record_id: ProfileRecordId,
        update: &ProfileUpdate,
    ) -> anyhow::Result<()>;
}

#[async_trait]
pub trait EventLogStore: Send + Sync {
    async fn append_workout(&self, entry: &WorkoutLogEntry) -> anyhow::Result<()>;

    async fn append_meal(&self, entry: &MealLogEntry) -> anyhow::Result<()>;

    async fn append_goal(&self, entry: &GoalEntry) -> anyhow::Result<()>;
}

/// Read side of the workout log, used by profile summaries.
#[async_trait]
pub trait WorkoutHistory: Send + Sync {
    /// Sessions and minutes per workout type, keyed by type.
    async fn workout_totals(&self, user_id: &str) -> anyhow::Result<BTreeMap<String, WorkoutTotal>>;
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// One request/response exchange; the reply is the raw model text.
    async fn complete(&self, system_prompt: &str, user_message: &str) -> anyhow::Result<String>;
}
