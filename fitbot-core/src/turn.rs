use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

use fitbot_utils::formatting::truncate_chars;
use fitbot_utils::time::today_utc;

use crate::badges::dedupe_badges;
use crate::error::TurnError;
use crate::model::{
    DEFAULT_USER_ID, GoalEntry, MealLogEntry, Profile, ProfileRecordId, ProfileUpdate,
    StoredProfile, TurnEvents, TurnOutcome, TurnRequest, WorkoutLogEntry,
};
use crate::ports::{EventLogStore, LanguageModel, ProfileStore};
use crate::prompt::{DEFAULT_COACH_PERSONA, coach_system_prompt};
use crate::rewards::{GamificationConfig, TurnProgress};
use crate::tags::extract_tags;

/// Max characters of reply text copied into workout/meal log rows.
pub const LOG_DETAILS_MAX_CHARS: usize = 300;

/// Status given to newly logged goals.
pub const NEW_GOAL_STATUS: &str = "active";

/// Runs chat turns: model call, tag extraction, event logging, scoring, profile write-back.
#[derive(Clone)]
pub struct TurnEngine {
    profiles: Arc<dyn ProfileStore>,
    event_logs: Arc<dyn EventLogStore>,
    model: Arc<dyn LanguageModel>,
    config: Arc<GamificationConfig>,
    persona: Arc<str>,
    user_locks: Arc<UserLocks>,
}

type UserLocks = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// Holds one user's turn lock; dropping it prunes the entry once no other turn waits on it.
struct UserLockLease {
    locks: Arc<UserLocks>,
    user_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for UserLockLease {
    fn drop(&mut self) {
        let Some(guard) = self.guard.take() else {
            return;
        };
        let mutex = Arc::clone(OwnedMutexGuard::mutex(&guard));
        drop(guard);

        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map and `mutex` still point at it: nobody is queued.
        let idle = locks
            .get(&self.user_id)
            .is_some_and(|entry| Arc::ptr_eq(entry, &mutex) && Arc::strong_count(&mutex) == 2);
        if idle {
            locks.remove(&self.user_id);
        }
    }
}

impl TurnEngine {
    pub fn new(
        profiles: Arc<dyn ProfileStore>,
        event_logs: Arc<dyn EventLogStore>,
        model: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            profiles,
            event_logs,
            model,
            config: Arc::new(GamificationConfig::default()),
            persona: Arc::from(DEFAULT_COACH_PERSONA),
            user_locks: Arc::default(),
        }
    }

    pub fn with_config(mut self, config: GamificationConfig) -> Self {
        self.config = Arc::new(config);
        self
    }

    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = Arc::from(persona.into());
        self
    }

    pub fn config(&self) -> &GamificationConfig {
        &self.config
    }

    pub async fn process_turn(&self, request: &TurnRequest) -> Result<TurnOutcome, TurnError> {
        self.process_turn_on(request, today_utc()).await
    }

    /// Run one turn as if it happened on `today` (UTC calendar date).
    pub async fn process_turn_on(
        &self,
        request: &TurnRequest,
        today: NaiveDate,
    ) -> Result<TurnOutcome, TurnError> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(TurnError::EmptyMessage);
        }

        let user_id = match request.user_id.trim() {
            "" => DEFAULT_USER_ID,
            trimmed => trimmed,
        };
        let _lease = self.lock_user(user_id).await;

        let stored = self
            .profiles
            .load_profile(user_id)
            .await
            .map_err(TurnError::Internal)?;
        let (record_id, profile) = match stored {
            Some(StoredProfile { record_id, profile }) => {
                (Some(record_id), self.heal_profile(profile))
            }
            None => (None, Profile::new_default(user_id)),
        };

        let system_prompt = coach_system_prompt(&self.persona, &profile);
        let raw_reply = match self.model.complete(&system_prompt, message).await {
            Ok(reply) => reply,
            Err(source) => {
                warn!(?source, user_id, "model call failed; turn aborted");
                return Err(TurnError::upstream(&source));
            }
        };

        let reply = extract_tags(&raw_reply);
        debug!(
            user_id,
            session_id = request.session_id.as_deref().unwrap_or_default(),
            events = reply.events.count(),
            "reply parsed"
        );

        self.append_event_logs(user_id, &reply.display_text, &reply.events, today)
            .await;

        let progress = self.config.settle_turn(&profile, &reply.events, today);
        self.persist_profile(record_id, &progress).await;

        if progress.leveled_up {
            info!(user_id, level = progress.profile.level, "user leveled up");
        }

        Ok(TurnOutcome {
            display_message: reply.display_text,
            experience_gained: progress.experience_gained,
            leveled_up: progress.leveled_up,
            new_badge: progress.award.highlight().map(|badge| badge.achievement()),
            profile: progress.profile.snapshot(),
        })
    }

    /// Recompute the derived level and clean the badge list of a loaded profile.
    pub fn heal_profile(&self, mut profile: Profile) -> Profile {
        let level = self.config.ladder.level_for(profile.total_xp);
        if level != profile.level {
            warn!(
                user_id = %profile.user_id,
                stored_level = profile.level,
                level,
                total_xp = profile.total_xp,
                "stored level disagrees with experience; using derived level"
            );
            profile.level = level;
        }
        profile.badges = dedupe_badges(&profile.badges);
        profile
    }

    async fn lock_user(&self, user_id: &str) -> UserLockLease {
        let lock = {
            let mut locks = self
                .user_locks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            locks.entry(user_id.to_owned()).or_default().clone()
        };

        UserLockLease {
            locks: Arc::clone(&self.user_locks),
            user_id: user_id.to_owned(),
            guard: Some(lock.lock_owned().await),
        }
    }

    #[cfg(test)]
    fn tracked_user_locks(&self) -> usize {
        self.user_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Attempt every log write concurrently; failures are logged, never raised.
    async fn append_event_logs(
        &self,
        user_id: &str,
        display_text: &str,
        events: &TurnEvents,
        today: NaiveDate,
    ) {
        let details = truncate_chars(display_text, LOG_DETAILS_MAX_CHARS);
        let rewards = self.config.rewards;

        let workout = async {
            let event = events.workout.as_ref()?;
            let entry = WorkoutLogEntry {
                user_id: user_id.to_owned(),
                date: today,
                kind: event.kind.clone(),
                details: details.to_owned(),
                duration_minutes: event.duration_minutes,
                xp_earned: rewards.workout,
            };
            Some(self.event_logs.append_workout(&entry).await)
        };

        let meal = async {
            let event = events.meal.as_ref()?;
            let entry = MealLogEntry {
                user_id: user_id.to_owned(),
                date: today,
                meal: event.kind.clone(),
                description: details.to_owned(),
                calories: event.calories,
                xp_earned: rewards.meal,
            };
            Some(self.event_logs.append_meal(&entry).await)
        };

        let goal = async {
            let event = events.goal.as_ref()?;
            let entry = GoalEntry {
                user_id: user_id.to_owned(),
                goal_type: event.kind.clone(),
                description: event.description.clone(),
                status: NEW_GOAL_STATUS.to_owned(),
                xp_reward: rewards.goal,
            };
            Some(self.event_logs.append_goal(&entry).await)
        };

        let (workout, meal, goal) = tokio::join!(workout, meal, goal);

        for (table, result) in [("workout", workout), ("meal", meal), ("goal", goal)] {
            if let Some(Err(source)) = result {
                warn!(?source, user_id, table, "failed to append event log; entry dropped");
            }
        }
    }

    async fn persist_profile(
        &self,
        record_id: Option<ProfileRecordId>,
        progress: &TurnProgress,
    ) {
        let profile = &progress.profile;
        let result = match record_id {
            Some(record_id) => {
                self.profiles
                    .update_profile(record_id, &ProfileUpdate::from(profile))
                    .await
            }
            None => self.profiles.create_profile(profile).await.map(|_| ()),
        };

        if let Err(source) = result {
            warn!(
                ?source,
                user_id = %profile.user_id,
                total_xp = profile.total_xp,
                "failed to persist profile; gamification state lost for this turn"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use super::TurnEngine;
    use crate::error::TurnError;
    use crate::model::{
        GoalEntry, MealLogEntry, Profile, ProfileRecordId, ProfileUpdate, StoredProfile,
        TurnRequest, WorkoutLogEntry,
    };
    use crate::ports::{EventLogStore, LanguageModel, ProfileStore};

    #[derive(Default)]
    struct MemoryProfiles {
        rows: Mutex<Vec<(ProfileRecordId, Profile)>>,
        fail_writes: bool,
    }

    impl MemoryProfiles {
        fn with(profile: Profile) -> Self {
            Self {
                rows: Mutex::new(vec![(1, profile)]),
                fail_writes: false,
            }
        }

        fn get(&self, user_id: &str) -> Option<Profile> {
            self.rows
                .lock()
                .unwrap()
                .iter()
                .find(|(_, profile)| profile.user_id == user_id)
                .map(|(_, profile)| profile.clone())
        }
    }

    #[async_trait]
    impl ProfileStore for MemoryProfiles {
        async fn load_profile(&self, user_id: &str) -> anyhow::Result<Option<StoredProfile>> {
            Ok(self
                .rows
                .lock()
                .unwrap()
                .iter()
                .find(|(_, profile)| profile.user_id == user_id)
                .map(|(record_id, profile)| StoredProfile {
                    record_id: *record_id,
                    profile: profile.clone(),
                }))
        }

        async fn create_profile(&self, profile: &Profile) -> anyhow::Result<ProfileRecordId> {
            if self.fail_writes {
                anyhow::bail!("profile table unavailable");
            }
            let mut rows = self.rows.lock().unwrap();
            let record_id = rows.len() as ProfileRecordId + 1;
            rows.push((record_id, profile.clone()));
            Ok(record_id)
        }

        async fn update_profile(
            &self,
            record_id: ProfileRecordId,
            update: &ProfileUpdate,
        ) -> anyhow::Result<()> {
            if self.fail_writes {
                anyhow::bail!("profile table unavailable");
            }
            let mut rows = self.rows.lock().unwrap();
            let (_, profile) = rows
                .iter_mut()
                .find(|(id, _)| *id == record_id)
                .ok_or_else(|| anyhow::anyhow!("no profile {record_id}"))?;
            profile.level = update.level;
            profile.total_xp = update.total_xp;
            profile.current_streak = update.current_streak;
            profile.last_active = update.last_active;
            profile.badges = update.badges.clone();
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemoryLogs {
        workouts: Mutex<Vec<WorkoutLogEntry>>,
        meals: Mutex<Vec<MealLogEntry>>,
        goals: Mutex<Vec<GoalEntry>>,
        fail_workouts: bool,
    }

    #[async_trait]
    impl EventLogStore for MemoryLogs {
        async fn append_workout(&self, entry: &WorkoutLogEntry) -> anyhow::Result<()> {
            if self.fail_workouts {
                anyhow::bail!("workout log unavailable");
            }
            self.workouts.lock().unwrap().push(entry.clone());
            Ok(())
        }

        async fn append_meal(&self, entry: &MealLogEntry) -> anyhow::Result<()> {
            self.meals.lock().unwrap().push(entry.clone());
            Ok(())
        }

        async fn append_goal(&self, entry: &GoalEntry) -> anyhow::Result<()> {
            self.goals.lock().unwrap().push(entry.clone());
            Ok(())
        }
    }

    struct ScriptedModel {
        reply: Result<String, String>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn replying(reply: &str) -> Self {
            Self {
                reply: Ok(reply.to_owned()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        fn failing(error: &str) -> Self {
            Self {
                reply: Err(error.to_owned()),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn complete(&self, system_prompt: &str, _user_message: &str) -> anyhow::Result<String> {
            self.prompts.lock().unwrap().push(system_prompt.to_owned());
            self.reply.clone().map_err(anyhow::Error::msg)
        }
    }

    struct Harness {
        profiles: Arc<MemoryProfiles>,
        logs: Arc<MemoryLogs>,
        model: Arc<ScriptedModel>,
        engine: TurnEngine,
    }

    fn harness(profiles: MemoryProfiles, logs: MemoryLogs, model: ScriptedModel) -> Harness {
        let profiles = Arc::new(profiles);
        let logs = Arc::new(logs);
        let model = Arc::new(model);
        let engine = TurnEngine::new(profiles.clone(), logs.clone(), model.clone());
        Harness {
            profiles,
            logs,
            model,
            engine,
        }
    }

    fn request(user_id: &str, message: &str) -> TurnRequest {
        TurnRequest {
            user_id: user_id.to_owned(),
            session_id: Some("session-1".to_owned()),
            message: message.to_owned(),
        }
    }

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
    }

    fn stored(user_id: &str) -> Profile {
        Profile {
            display_name: "Sam".to_owned(),
            ..Profile::new_default(user_id)
        }
    }

    #[tokio::test]
    async fn first_workout_on_fresh_profile() {
        let h = harness(
            MemoryProfiles::with(stored("u1")),
            MemoryLogs::default(),
            ScriptedModel::replying("Great job! [WORKOUT: type=run, duration=30]"),
        );

        let outcome = h
            .engine
            .process_turn_on(&request("u1", "I ran for 30 minutes"), date(10))
            .await
            .unwrap();

        assert_eq!(outcome.display_message, "Great job!");
        assert_eq!(outcome.experience_gained, 50);
        assert!(!outcome.leveled_up);
        assert_eq!(outcome.new_badge.map(|badge| badge.name), Some("First Rep".to_owned()));
        assert_eq!(outcome.profile.total_xp, 50);
        assert_eq!(outcome.profile.level, 1);
        assert_eq!(outcome.profile.current_streak, 1);

        let workouts = h.logs.workouts.lock().unwrap();
        assert_eq!(workouts.len(), 1);
        assert_eq!(workouts[0].kind, "run");
        assert_eq!(workouts[0].duration_minutes, 30);
        assert_eq!(workouts[0].details, "Great job!");
        assert_eq!(workouts[0].xp_earned, 50);

        let saved = h.profiles.get("u1").unwrap();
        assert_eq!(saved.total_xp, 50);
        assert_eq!(saved.last_active, Some(date(10)));
        assert_eq!(saved.badges, vec!["First Rep".to_owned()]);
    }

    #[tokio::test]
    async fn prompt_carries_profile_context() {
        let profile = Profile {
            total_xp: 120,
            level: 2,
            current_streak: 2,
            badges: vec!["First Rep".to_owned()],
            ..stored("u1")
        };
        let h = harness(
            MemoryProfiles::with(profile),
            MemoryLogs::default(),
            ScriptedModel::replying("Keep going."),
        );

        h.engine
            .process_turn_on(&request("u1", "hello"), date(10))
            .await
            .unwrap();

        let prompts = h.model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("- Name: Sam"));
        assert!(prompts[0].contains("- Level: 2 | XP: 120 | Streak: 2 days"));
        assert!(prompts[0].contains("- Badges earned: First Rep"));
    }

    #[tokio::test]
    async fn streak_continues_from_yesterday_and_unlocks_on_fire() {
        let profile = Profile {
            total_xp: 120,
            level: 2,
            current_streak: 2,
            last_active: Some(date(9)),
            badges: vec!["First Rep".to_owned()],
            ..stored("u1")
        };
        let h = harness(
            MemoryProfiles::with(profile),
            MemoryLogs::default(),
            ScriptedModel::replying("Nice lift! [WORKOUT: type=lift, duration=40min]"),
        );

        let outcome = h
            .engine
            .process_turn_on(&request("u1", "Lifted today"), date(10))
            .await
            .unwrap();

        assert_eq!(outcome.experience_gained, 60);
        assert_eq!(outcome.profile.current_streak, 3);
        assert_eq!(outcome.new_badge.map(|badge| badge.name), Some("On Fire".to_owned()));
    }

    #[tokio::test]
    async fn chatter_without_events_earns_nothing() {
        let profile = Profile {
            total_xp: 400,
            level: 3,
            current_streak: 5,
            last_active: Some(date(1)),
            ..stored("u1")
        };
        let h = harness(
            MemoryProfiles::with(profile),
            MemoryLogs::default(),
            ScriptedModel::replying("Stretching helps recovery."),
        );

        let outcome = h
            .engine
            .process_turn_on(&request("u1", "any tips?"), date(10))
            .await
            .unwrap();

        assert_eq!(outcome.experience_gained, 0);
        assert_eq!(outcome.profile.current_streak, 5);
        assert!(outcome.new_badge.is_none());
        assert!(h.logs.workouts.lock().unwrap().is_empty());
        assert_eq!(h.profiles.get("u1").unwrap().last_active, Some(date(1)));
    }

    #[tokio::test]
    async fn upstream_failure_leaves_state_untouched() {
        let h = harness(
            MemoryProfiles::with(stored("u1")),
            MemoryLogs::default(),
            ScriptedModel::failing("status 503: overloaded"),
        );

        let err = h
            .engine
            .process_turn_on(&request("u1", "I ran 5k"), date(10))
            .await
            .unwrap_err();

        match err {
            TurnError::Upstream(detail) => assert!(detail.contains("503")),
            other => panic!("expected upstream error, got {other:?}"),
        }
        assert_eq!(h.profiles.get("u1").unwrap(), stored("u1"));
        assert!(h.logs.workouts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_message_is_rejected_before_model_call() {
        let h = harness(
            MemoryProfiles::default(),
            MemoryLogs::default(),
            ScriptedModel::replying("unused"),
        );

        let err = h
            .engine
            .process_turn_on(&request("u1", "   "), date(10))
            .await
            .unwrap_err();

        assert!(matches!(err, TurnError::EmptyMessage));
        assert!(h.model.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_log_write_does_not_block_siblings_or_turn() {
        let logs = MemoryLogs {
            fail_workouts: true,
            ..MemoryLogs::default()
        };
        let h = harness(
            MemoryProfiles::with(stored("u1")),
            logs,
            ScriptedModel::replying(
                "Great session and solid lunch! [WORKOUT: type=swim, duration=25] [MEAL: type=lunch, calories=600]",
            ),
        );

        let outcome = h
            .engine
            .process_turn_on(&request("u1", "swam then ate"), date(10))
            .await
            .unwrap();

        assert_eq!(outcome.experience_gained, 70);
        assert!(h.logs.workouts.lock().unwrap().is_empty());
        let meals = h.logs.meals.lock().unwrap();
        assert_eq!(meals.len(), 1);
        assert_eq!(meals[0].calories, 600);
        assert_eq!(meals[0].meal, "lunch");
    }

    #[tokio::test]
    async fn failed_profile_write_still_returns_reply() {
        let profiles = MemoryProfiles {
            fail_writes: true,
            ..MemoryProfiles::with(stored("u1"))
        };
        let h = harness(
            profiles,
            MemoryLogs::default(),
            ScriptedModel::replying("Goal noted! [GOAL: type=distance, description=run a 10k]"),
        );

        let outcome = h
            .engine
            .process_turn_on(&request("u1", "I want to run a 10k"), date(10))
            .await
            .unwrap();

        assert_eq!(outcome.experience_gained, 25);
        assert_eq!(outcome.new_badge.map(|badge| badge.icon), Some("🎯".to_owned()));
        assert_eq!(h.profiles.get("u1").unwrap().total_xp, 0);

        let goals = h.logs.goals.lock().unwrap();
        assert_eq!(goals[0].description, "run a 10k");
        assert_eq!(goals[0].status, "active");
    }

    #[tokio::test]
    async fn unknown_user_gets_a_profile_created() {
        let h = harness(
            MemoryProfiles::default(),
            MemoryLogs::default(),
            ScriptedModel::replying("Logged your meal. [MEAL: type=breakfast, calories=350]"),
        );

        let outcome = h
            .engine
            .process_turn_on(&request("new-user", "oats for breakfast"), date(10))
            .await
            .unwrap();

        assert_eq!(outcome.experience_gained, 20);
        let created = h.profiles.get("new-user").unwrap();
        assert_eq!(created.display_name, "Athlete");
        assert_eq!(created.total_xp, 20);
        assert_eq!(created.badges, vec!["Fuel Up".to_owned()]);
    }

    #[tokio::test]
    async fn stale_stored_level_is_healed_before_scoring() {
        let profile = Profile {
            total_xp: 240,
            level: 7,
            ..stored("u1")
        };
        let h = harness(
            MemoryProfiles::with(profile),
            MemoryLogs::default(),
            ScriptedModel::replying("Done! [WORKOUT: type=row, duration=20]"),
        );

        let outcome = h
            .engine
            .process_turn_on(&request("u1", "rowed"), date(10))
            .await
            .unwrap();

        assert_eq!(outcome.profile.total_xp, 290);
        assert_eq!(outcome.profile.level, 3);
        assert!(outcome.leveled_up);
        assert!(h.model.prompts.lock().unwrap()[0].contains("- Level: 2 |"));
    }

    #[tokio::test]
    async fn concurrent_turns_for_one_user_do_not_lose_experience() {
        let h = harness(
            MemoryProfiles::with(stored("u1")),
            MemoryLogs::default(),
            ScriptedModel::replying("Logged. [WORKOUT: type=walk, duration=15]"),
        );

        let first = request("u1", "walked");
        let second = request("u1", "walked again");
        let (a, b) = tokio::join!(
            h.engine.process_turn_on(&first, date(10)),
            h.engine.process_turn_on(&second, date(10)),
        );
        a.unwrap();
        b.unwrap();

        // The second turn sees streak 1 from the first, so its bonus is 5.
        assert_eq!(h.profiles.get("u1").unwrap().total_xp, 105);
    }

    #[tokio::test]
    async fn user_locks_are_released_after_turns() {
        let h = harness(
            MemoryProfiles::default(),
            MemoryLogs::default(),
            ScriptedModel::replying("Logged. [WORKOUT: type=walk, duration=15]"),
        );

        for n in 0..200 {
            h.engine
                .process_turn_on(&request(&format!("user-{n}"), "walked"), date(10))
                .await
                .unwrap();
        }
        assert_eq!(h.engine.tracked_user_locks(), 0);

        let first = request("u1", "walked");
        let second = request("u1", "walked again");
        let (a, b) = tokio::join!(
            h.engine.process_turn_on(&first, date(10)),
            h.engine.process_turn_on(&second, date(10)),
        );
        a.unwrap();
        b.unwrap();
        assert_eq!(h.engine.tracked_user_locks(), 0);
    }

    #[tokio::test]
    async fn user_lock_is_released_when_turn_fails() {
        let h = harness(
            MemoryProfiles::default(),
            MemoryLogs::default(),
            ScriptedModel::failing("model offline"),
        );

        let err = h
            .engine
            .process_turn_on(&request("u1", "hello"), date(10))
            .await
            .unwrap_err();
        assert!(matches!(err, TurnError::Upstream(_)));
        assert_eq!(h.engine.tracked_user_locks(), 0);
    }
}
