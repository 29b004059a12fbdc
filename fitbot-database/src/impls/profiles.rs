use anyhow::Context as _;
use tracing::warn;

use fitbot_core::model::{
    DEFAULT_DISPLAY_NAME, Profile, ProfileRecordId, ProfileUpdate, StoredProfile,
};
use fitbot_utils::time::now_unix_secs;

use crate::cache::{PROFILE_CACHE_TTL, invalidate_profile, profile_key};
use crate::database::Database;
use crate::model::profile::ProfileRow;

/// Fetch the profile for `user_id`, served from cache when available.
pub async fn get_profile(db: &Database, user_id: &str) -> anyhow::Result<Option<StoredProfile>> {
    let cache_key = profile_key(db.cache(), user_id);
    db.cache()
        .get_or_load_json(&cache_key, PROFILE_CACHE_TTL, || async {
            let row = sqlx::query_as::<_, ProfileRow>(
                "SELECT id, user_id, display_name, level, total_xp, current_streak, last_active, badges
                 FROM user_profiles
                 WHERE user_id = $1
                 LIMIT 1",
            )
            .bind(user_id)
            .fetch_optional(db.pool())
            .await?;

            row.map(stored_profile_from_row).transpose()
        })
        .await
}

/// Insert a profile row and return its id.
pub async fn create_profile(db: &Database, profile: &Profile) -> anyhow::Result<ProfileRecordId> {
    let level_i32 = i32::try_from(profile.level).context("level out of i32 range")?;
    let total_xp_i64 = i64::try_from(profile.total_xp).context("total_xp out of i64 range")?;
    let streak_i32 =
        i32::try_from(profile.current_streak).context("current_streak out of i32 range")?;
    let badges = encode_badges(&profile.badges)?;
    let now_i64 = i64::try_from(now_unix_secs()).context("created_at out of i64 range")?;

    let record_id: i64 = sqlx::query_scalar(
        "INSERT INTO user_profiles
            (user_id, display_name, level, total_xp, current_streak, last_active, badges, created_at, updated_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $8)
         RETURNING id",
    )
    .bind(&profile.user_id)
    .bind(&profile.display_name)
    .bind(level_i32)
    .bind(total_xp_i64)
    .bind(streak_i32)
    .bind(profile.last_active)
    .bind(badges)
    .bind(now_i64)
    .fetch_one(db.pool())
    .await?;

    if let Err(err) = invalidate_profile(db.cache(), &profile.user_id).await {
        warn!(?err, user_id = %profile.user_id, "failed to invalidate cached profile");
    }

    Ok(record_id)
}

/// Overwrite the gamification columns of an existing profile row.
pub async fn update_profile(
    db: &Database,
    record_id: ProfileRecordId,
    update: &ProfileUpdate,
) -> anyhow::Result<()> {
    let level_i32 = i32::try_from(update.level).context("level out of i32 range")?;
    let total_xp_i64 = i64::try_from(update.total_xp).context("total_xp out of i64 range")?;
    let streak_i32 =
        i32::try_from(update.current_streak).context("current_streak out of i32 range")?;
    let badges = encode_badges(&update.badges)?;
    let now_i64 = i64::try_from(now_unix_secs()).context("updated_at out of i64 range")?;

    let user_id: Option<String> = sqlx::query_scalar(
        "UPDATE user_profiles
         SET level = $2, total_xp = $3, current_streak = $4, last_active = $5, badges = $6, updated_at = $7
         WHERE id = $1
         RETURNING user_id",
    )
    .bind(record_id)
    .bind(level_i32)
    .bind(total_xp_i64)
    .bind(streak_i32)
    .bind(update.last_active)
    .bind(badges)
    .bind(now_i64)
    .fetch_optional(db.pool())
    .await?;

    let Some(user_id) = user_id else {
        anyhow::bail!("profile record {record_id} does not exist");
    };

    if let Err(err) = invalidate_profile(db.cache(), &user_id).await {
        warn!(?err, user_id = %user_id, "failed to invalidate cached profile");
    }

    Ok(())
}

fn stored_profile_from_row(row: ProfileRow) -> anyhow::Result<StoredProfile> {
    let display_name = row
        .display_name
        .map(|name| name.trim().to_owned())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_owned());

    Ok(StoredProfile {
        record_id: row.id,
        profile: Profile {
            level: u32::try_from(row.level.max(1)).context("level row out of u32 range")?,
            total_xp: u64::try_from(row.total_xp).context("total_xp row out of u64 range")?,
            current_streak: u32::try_from(row.current_streak)
                .context("current_streak row out of u32 range")?,
            last_active: row.last_active,
            badges: decode_badges(&row.user_id, &row.badges),
            display_name,
            user_id: row.user_id,
        },
    })
}

fn encode_badges(badges: &[String]) -> anyhow::Result<String> {
    serde_json::to_string(badges).context("failed to encode badge list")
}

/// Stored badge lists are JSON arrays; anything unreadable counts as no badges.
fn decode_badges(user_id: &str, raw: &str) -> Vec<String> {
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(badges) => badges,
        Err(source) => {
            warn!(?source, user_id, "unreadable badge list; treating as empty");
            Vec::new()
        }
    }
}
