use fitbot_utils::formatting::{format_badge_list, format_streak_days};

use crate::model::Profile;

pub const DEFAULT_COACH_PERSONA: &str = "You are FitBot, a motivating personal fitness coach. Be concise, warm, and specific.";

const RESPONSIBILITIES: &str = "YOUR RESPONSIBILITIES:
1. Have natural fitness conversations and give personalized advice
2. When the user logs a workout, confirm it enthusiastically
3. When the user mentions food/meals, acknowledge their nutrition
4. Celebrate streaks, milestones, and personal bests
5. Suggest improvements and next steps";

const TAGGING_RULES: &str = "DATA TAGGING - append silently at the END of your response when applicable:
- Workout mentioned: append [WORKOUT: type=X, duration=Xmin]
- Meal mentioned: append [MEAL: type=X, calories=X]
- Goal set: append [GOAL: type=X, description=X]";

/// System prompt for one turn: persona, the user's current standing, and the tagging contract.
pub fn coach_system_prompt(persona: &str, profile: &Profile) -> String {
    let persona = persona.trim();
    let persona = if persona.is_empty() {
        DEFAULT_COACH_PERSONA
    } else {
        persona
    };

    format!(
        "{persona}\n\nUSER PROFILE:\n- Name: {name}\n- Level: {level} | XP: {xp} | Streak: {streak}\n- Badges earned: {badges}\n\n{RESPONSIBILITIES}\n\n{TAGGING_RULES}",
        name = profile.display_name,
        level = profile.level,
        xp = profile.total_xp,
        streak = format_streak_days(profile.current_streak),
        badges = format_badge_list(&profile.badges),
    )
}
