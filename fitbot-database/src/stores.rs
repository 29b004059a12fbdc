//! `fitbot-core` collaborator traits backed by PostgreSQL.

use std::collections::BTreeMap;

use async_trait::async_trait;

use fitbot_core::model::{
    GoalEntry, MealLogEntry, Profile, ProfileRecordId, ProfileUpdate, StoredProfile,
    WorkoutLogEntry, WorkoutTotal,
};
use fitbot_core::ports::{EventLogStore, ProfileStore, WorkoutHistory};

use crate::database::Database;
use crate::impls::{event_logs, profiles};

#[async_trait]
impl ProfileStore for Database {
    async fn load_profile(&self, user_id: &str) -> anyhow::Result<Option<StoredProfile>> {
        profiles::get_profile(self, user_id).await
    }

    async fn create_profile(&self, profile: &Profile) -> anyhow::Result<ProfileRecordId> {
        profiles::create_profile(self, profile).await
    }

    async fn update_profile(
        &self,
        record_id: ProfileRecordId,
        update: &ProfileUpdate,
    ) -> anyhow::Result<()> {
        profiles::update_profile(self, record_id, update).await
    }
}

#[async_trait]
impl EventLogStore for Database {
    async fn append_workout(&self, entry: &WorkoutLogEntry) -> anyhow::Result<()> {
        event_logs::insert_workout_log(self, entry).await
    }

    async fn append_meal(&self, entry: &MealLogEntry) -> anyhow::Result<()> {
        event_logs::insert_meal_log(self, entry).await
    }

    async fn append_goal(&self, entry: &GoalEntry) -> anyhow::Result<()> {
        event_logs::insert_goal(self, entry).await
    }
}

#[async_trait]
impl WorkoutHistory for Database {
    async fn workout_totals(&self, user_id: &str) -> anyhow::Result<BTreeMap<String, WorkoutTotal>> {
        event_logs::workout_totals_by_type(self, user_id).await
    }
}
