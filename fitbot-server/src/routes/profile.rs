use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Path, State};
use chrono::NaiveDate;
use serde::Serialize;

use fitbot_core::badges::icon_for;
use fitbot_core::model::{Achievement, DEFAULT_USER_ID, Profile, WorkoutTotal};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub user_id: String,
    pub display_name: String,
    pub level: u32,
    #[serde(rename = "totalXP")]
    pub total_xp: u64,
    pub current_streak: u32,
    pub last_active: Option<NaiveDate>,
    pub progress_percent: f64,
    pub xp_into_level: u64,
    pub xp_for_next_level: u64,
    pub badges: Vec<Achievement>,
    pub workout_totals: BTreeMap<String, WorkoutTotal>,
}

/// Stored profile (or a fresh default) with leveling progress and workout totals.
pub async fn profile_summary(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ProfileSummary>, ApiError> {
    let user_id = match user_id.trim() {
        "" => DEFAULT_USER_ID.to_owned(),
        trimmed => trimmed.to_owned(),
    };

    let profile = match state.profiles.load_profile(&user_id).await? {
        Some(stored) => state.engine.heal_profile(stored.profile),
        None => Profile::new_default(&user_id),
    };
    let workout_totals = state.workouts.workout_totals(&user_id).await?;
    let standing = state.engine.config().ladder.standing(profile.total_xp);

    let badges = profile
        .badges
        .iter()
        .map(|name| Achievement {
            name: name.clone(),
            icon: icon_for(name).to_owned(),
        })
        .collect();

    Ok(Json(ProfileSummary {
        progress_percent: standing.progress_percent(),
        xp_into_level: standing.into_level,
        xp_for_next_level: standing.level_cost,
        user_id: profile.user_id,
        display_name: profile.display_name,
        level: profile.level,
        total_xp: profile.total_xp,
        current_streak: profile.current_streak,
        last_active: profile.last_active,
        badges,
        workout_totals,
    }))
}
