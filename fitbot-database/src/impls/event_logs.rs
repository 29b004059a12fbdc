use std::collections::BTreeMap;

use anyhow::Context as _;

use fitbot_core::model::{GoalEntry, MealLogEntry, WorkoutLogEntry, WorkoutTotal};
use fitbot_utils::time::now_unix_secs;

use crate::database::Database;

pub async fn insert_workout_log(db: &Database, entry: &WorkoutLogEntry) -> anyhow::Result<()> {
    let duration_i32 =
        i32::try_from(entry.duration_minutes).context("duration_minutes out of i32 range")?;
    let xp_i32 = i32::try_from(entry.xp_earned).context("xp_earned out of i32 range")?;
    let created_at_i64 = i64::try_from(now_unix_secs()).context("created_at out of i64 range")?;

    sqlx::query(
        "INSERT INTO workout_logs (user_id, log_date, workout_type, details, duration_minutes, xp_earned, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(&entry.user_id)
    .bind(entry.date)
    .bind(&entry.kind)
    .bind(&entry.details)
    .bind(duration_i32)
    .bind(xp_i32)
    .bind(created_at_i64)
    .execute(db.pool())
    .await?;

    Ok(())
}

pub async fn insert_meal_log(db: &Database, entry: &MealLogEntry) -> anyhow::Result<()> {
    let calories_i32 = i32::try_from(entry.calories).context("calories out of i32 range")?;
    let xp_i32 = i32::try_from(entry.xp_earned).context("xp_earned out of i32 range")?;
    let created_at_i64 = i64::try_from(now_unix_secs()).context("created_at out of i64 range")?;

    sqlx::query(
        "INSERT INTO nutrition_logs (user_id, log_date, meal, description, calories, xp_earned, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(&entry.user_id)
    .bind(entry.date)
    .bind(&entry.meal)
    .bind(&entry.description)
    .bind(calories_i32)
    .bind(xp_i32)
    .bind(created_at_i64)
    .execute(db.pool())
    .await?;

    Ok(())
}

pub async fn insert_goal(db: &Database, entry: &GoalEntry) -> anyhow::Result<()> {
    let xp_i32 = i32::try_from(entry.xp_reward).context("xp_reward out of i32 range")?;
    let created_at_i64 = i64::try_from(now_unix_secs()).context("created_at out of i64 range")?;

    sqlx::query(
        "INSERT INTO goals (user_id, goal_type, description, status, xp_reward, created_at)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(&entry.user_id)
    .bind(&entry.goal_type)
    .bind(&entry.description)
    .bind(&entry.status)
    .bind(xp_i32)
    .bind(created_at_i64)
    .execute(db.pool())
    .await?;

    Ok(())
}

/// Sessions and minutes per workout type for one user.
pub async fn workout_totals_by_type(
    db: &Database,
    user_id: &str,
) -> anyhow::Result<BTreeMap<String, WorkoutTotal>> {
    let rows = sqlx::query_as::<_, (String, i64, i64)>(
        "SELECT workout_type, COUNT(*), COALESCE(SUM(duration_minutes), 0)::BIGINT
         FROM workout_logs
         WHERE user_id = $1
         GROUP BY workout_type
         ORDER BY workout_type ASC",
    )
    .bind(user_id)
    .fetch_all(db.pool())
    .await?;

    let mut totals = BTreeMap::new();
    for (workout_type, sessions, minutes) in rows {
        totals.insert(
            workout_type,
            WorkoutTotal {
                sessions: u64::try_from(sessions).context("sessions row out of u64 range")?,
                minutes: u64::try_from(minutes).context("minutes row out of u64 range")?,
            },
        );
    }

    Ok(totals)
}
