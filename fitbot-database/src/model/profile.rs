use chrono::NaiveDate;

/// Raw `user_profiles` row before conversion into the domain profile.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct ProfileRow {
    pub id: i64,
    pub user_id: String,
    pub display_name: Option<String>,
    pub level: i32,
    pub total_xp: i64,
    pub current_streak: i32,
    pub last_active: Option<NaiveDate>,
    pub badges: String,
}
