//! Inline annotations the coach model appends to its replies, e.g.
//! `[WORKOUT: type=run, duration=30min]`.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex_lite::Regex;

use fitbot_utils::formatting::collapse_inline_whitespace;
use fitbot_utils::parse::{parse_key_value_pairs, parse_leading_u32_or_zero};

use crate::model::{DEFAULT_EVENT_KIND, GoalEvent, MealEvent, TurnEvents, WorkoutEvent};

static WORKOUT_TAG: LazyLock<Regex> = LazyLock::new(|| tag_pattern("WORKOUT"));
static MEAL_TAG: LazyLock<Regex> = LazyLock::new(|| tag_pattern("MEAL"));
static GOAL_TAG: LazyLock<Regex> = LazyLock::new(|| tag_pattern("GOAL"));
static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\[(?:WORKOUT|MEAL|GOAL)[^\]]*\]").expect("annotation strip pattern is valid")
});

fn tag_pattern(keyword: &str) -> Regex {
    Regex::new(&format!(r"(?i)\[{keyword}:([^\]]*)\]")).expect("annotation pattern is valid")
}

/// A reply split into what the user sees and what the gamification layer consumes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExtractedReply {
    pub display_text: String,
    pub events: TurnEvents,
}

/// Pull workout/meal/goal annotations out of a raw model reply.
///
/// Never fails: malformed annotations are stripped from the display text and
/// produce no event.
pub fn extract_tags(raw: &str) -> ExtractedReply {
    let workout = first_tag_fields(&WORKOUT_TAG, raw).map(|fields| WorkoutEvent {
        kind: kind_or_default(&fields),
        duration_minutes: parse_leading_u32_or_zero(fields.get("duration").map(String::as_str)),
    });

    let meal = first_tag_fields(&MEAL_TAG, raw).map(|fields| MealEvent {
        kind: kind_or_default(&fields),
        calories: parse_leading_u32_or_zero(fields.get("calories").map(String::as_str)),
    });

    let goal = first_tag_fields(&GOAL_TAG, raw).map(|fields| GoalEvent {
        kind: kind_or_default(&fields),
        description: fields.get("description").cloned().unwrap_or_default(),
    });

    ExtractedReply {
        display_text: strip_tags(raw),
        events: TurnEvents {
            workout,
            meal,
            goal,
        },
    }
}

/// Remove every recognized annotation, well-formed or not.
pub fn strip_tags(raw: &str) -> String {
    if !ANY_TAG.is_match(raw) {
        return raw.to_owned();
    }

    let stripped = ANY_TAG.replace_all(raw, "");
    collapse_inline_whitespace(&stripped)
}

/// Fields of the first annotation of one category that has a non-blank body.
fn first_tag_fields(pattern: &Regex, raw: &str) -> Option<HashMap<String, String>> {
    pattern
        .captures_iter(raw)
        .filter_map(|caps| caps.get(1))
        .map(|body| body.as_str().trim())
        .find(|body| !body.is_empty())
        .map(|body| parse_key_value_pairs(body).into_iter().collect())
}

fn kind_or_default(fields: &HashMap<String, String>) -> String {
    fields
        .get("type")
        .filter(|value| !value.is_empty())
        .cloned()
        .unwrap_or_else(|| DEFAULT_EVENT_KIND.to_owned())
}

#[cfg(test)]
mod tests {
    use super::{extract_tags, strip_tags};
    use crate::model::{GoalEvent, MealEvent, WorkoutEvent};

    #[test]
    fn workout_tag_is_extracted_and_stripped() {
        let reply = extract_tags("Great job! [WORKOUT: type=run, duration=30]");
        assert_eq!(reply.display_text, "Great job!");
        assert_eq!(
            reply.events.workout,
            Some(WorkoutEvent {
                kind: "run".to_owned(),
                duration_minutes: 30,
            })
        );
        assert!(reply.events.meal.is_none());
        assert!(reply.events.goal.is_none());
    }

    #[test]
    fn text_without_brackets_is_unchanged() {
        let text = "Rest days matter too.  Drink water!";
        let reply = extract_tags(text);
        assert_eq!(reply.display_text, text);
        assert!(reply.events.is_empty());
    }

    #[test]
    fn empty_tag_is_stripped_without_event() {
        let reply = extract_tags("Tell me more. [WORKOUT:]");
        assert_eq!(reply.display_text, "Tell me more.");
        assert!(reply.events.is_empty());

        let reply = extract_tags("[MEAL:    ] ok");
        assert_eq!(reply.display_text, "ok");
        assert!(reply.events.meal.is_none());
    }

    #[test]
    fn tag_without_colon_is_stripped_without_event() {
        let reply = extract_tags("Logged. [WORKOUT type=run]");
        assert_eq!(reply.display_text, "Logged.");
        assert!(reply.events.workout.is_none());
    }

    #[test]
    fn all_three_categories_case_insensitive() {
        let raw = "Solid day!\n[workout: type=lift, duration=45min]\n[Meal: type=lunch, calories=650 kcal] [GOAL: type=weight, description=lose 5kg by June]";
        let reply = extract_tags(raw);

        assert_eq!(reply.display_text, "Solid day!");
        assert_eq!(
            reply.events.workout,
            Some(WorkoutEvent {
                kind: "lift".to_owned(),
                duration_minutes: 45,
            })
        );
        assert_eq!(
            reply.events.meal,
            Some(MealEvent {
                kind: "lunch".to_owned(),
                calories: 650,
            })
        );
        assert_eq!(
            reply.events.goal,
            Some(GoalEvent {
                kind: "weight".to_owned(),
                description: "lose 5kg by June".to_owned(),
            })
        );
        assert_eq!(reply.events.count(), 3);
    }

    #[test]
    fn only_first_tag_per_category_is_honored() {
        let reply = extract_tags(
            "Two runs! [WORKOUT: type=run, duration=20] [WORKOUT: type=swim, duration=40]",
        );
        assert_eq!(reply.display_text, "Two runs!");
        assert_eq!(
            reply.events.workout,
            Some(WorkoutEvent {
                kind: "run".to_owned(),
                duration_minutes: 20,
            })
        );
    }

    #[test]
    fn blank_tag_does_not_shadow_a_later_valid_one() {
        let reply = extract_tags("[WORKOUT:] then [WORKOUT: type=bike, duration=60]");
        assert_eq!(reply.display_text, "then");
        assert_eq!(
            reply.events.workout.map(|event| event.kind),
            Some("bike".to_owned())
        );
    }

    #[test]
    fn missing_fields_use_defaults() {
        let reply = extract_tags("Noted [WORKOUT: felt strong] [MEAL: calories=lots]");
        assert_eq!(
            reply.events.workout,
            Some(WorkoutEvent {
                kind: "general".to_owned(),
                duration_minutes: 0,
            })
        );
        assert_eq!(
            reply.events.meal,
            Some(MealEvent {
                kind: "general".to_owned(),
                calories: 0,
            })
        );
    }

    #[test]
    fn values_keep_inner_equals_signs() {
        let reply = extract_tags("[GOAL: type=pace, description=pace=5:00/km]");
        assert_eq!(
            reply.events.goal.map(|goal| goal.description),
            Some("pace=5:00/km".to_owned())
        );
    }

    #[test]
    fn unterminated_bracket_is_left_alone() {
        let text = "Almost [WORKOUT: type=run";
        let reply = extract_tags(text);
        assert_eq!(reply.display_text, text);
        assert!(reply.events.is_empty());
    }

    #[test]
    fn unrelated_brackets_survive_stripping() {
        assert_eq!(
            strip_tags("See [1] and [note] [MEAL: type=snack]"),
            "See [1] and [note]"
        );
    }

    #[test]
    fn whitespace_around_inline_tag_collapses() {
        assert_eq!(
            strip_tags("Nice [WORKOUT: type=run]  work."),
            "Nice work."
        );
    }
}
