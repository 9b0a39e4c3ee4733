//! Prompt assembly. Every builder returns a [`PromptPair`]: the full prompt
//! and a stricter fallback used when the first response is incomplete.

use fitai_db::models::{Profile, WorkoutPlace};

use crate::profile::CheckIn;

/// Primary prompt plus its strict fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptPair {
    pub primary: String,
    pub strict: String,
}

const ROLE: &str = "ROLE: Certified Indian fitness coach and nutritionist.";

const FORMAT_RULES: &str = "\
FORMAT (bullet points, follow exactly):
- Title
- 7-Day Workout Plan
  - Day 1: through Day 7:, each with exercises as sets x reps
- 7-Day Diet Plan
  - Day 1: through Day 7:, each with Breakfast, Lunch, Dinner
- Hydration note

Every day heading MUST be written as \"Day N:\" (for example \"Day 7:\").
Output ONLY the plan. No explanations, reviews, or commentary.";

const STRICT_RULES: &str = "\
CRITICAL (NON-NEGOTIABLE):
- Return a COMPLETE 7-day plan
- Workout AND diet MUST include Day 1: through Day 7:
- Do NOT skip Day 7
- Do NOT summarize, stop early, or explain";

fn workout_place_rule(place: WorkoutPlace) -> &'static str {
    match place {
        WorkoutPlace::Gym => {
            "- Use ONLY gym exercises with barbells, dumbbells, and machines \
             (leg press, lat pulldown, chest press)\n\
             - Do NOT include walking, jogging, yoga, or bodyweight-only home cardio"
        }
        WorkoutPlace::Home => {
            "- Use ONLY bodyweight or minimal-equipment exercises\n\
             - Do NOT include gym machines or barbells"
        }
    }
}

fn profile_context(profile: &Profile, preferences: Option<&str>) -> String {
    let mut out = String::with_capacity(512);
    out.push_str(&format!("- Location: {}, {}\n", profile.city, profile.state));
    out.push_str(&format!("- Goal: {}\n", profile.goal.label()));
    out.push_str(&format!("- Diet type: {}\n", profile.diet.label()));
    out.push_str(&format!("- Weekly food budget: \u{20B9}{}\n", profile.weekly_budget));
    out.push_str(&format!("- Workout place: {}\n", profile.workout_place.label()));
    out.push_str(&format!(
        "- Age {}, height {:.0} cm, weight {:.1} kg\n",
        profile.age, profile.height_cm, profile.weight_kg
    ));
    match preferences {
        Some(text) => out.push_str(&format!("- User preferences: {text}\n")),
        None => out.push_str("- User preferences: No specific preferences provided\n"),
    }
    out
}

/// Prompts for a user's first plan.
pub fn initial_plan(profile: &Profile, preferences: Option<&str>) -> PromptPair {
    let primary = format!(
        "{ROLE}

Generate a COMPLETE 7-day workout plan AND 7-day diet plan.

USER CONTEXT:
{context}
DIET RULES:
- Use foods commonly eaten and affordable in {city}, {state}
- Prefer local, seasonal foods; replace expensive items with cheaper local ones
- Stay within the weekly budget and the diet type strictly
- Student-friendly, hostel/home suitable, no supplements
- Respect user preferences; if one conflicts with safety, choose a safer alternative

WORKOUT PLACE RULES ({place}):
{place_rule}

{FORMAT_RULES}",
        context = profile_context(profile, preferences),
        city = profile.city,
        state = profile.state,
        place = profile.workout_place.label(),
        place_rule = workout_place_rule(profile.workout_place),
    );

    let strict = format!(
        "You are a fitness plan generator.

{STRICT_RULES}

USER CONTEXT:
{context}
WORKOUT PLACE RULES ({place}):
{place_rule}

{FORMAT_RULES}",
        context = profile_context(profile, preferences),
        place = profile.workout_place.label(),
        place_rule = workout_place_rule(profile.workout_place),
    );

    PromptPair { primary, strict }
}

/// Prompts for week `week`, built from the user's check-in and the plan it
/// replaces.
pub fn next_week_plan(
    profile: &Profile,
    check_in: &CheckIn,
    week: i32,
    previous_plan: &str,
    preferences: Option<&str>,
) -> PromptPair {
    let primary = format!(
        "{ROLE}

Generate a COMPLETELY NEW 7-day workout and diet plan for WEEK {week}.
The previous plan is provided ONLY so you can avoid repeating it.

USER CONTEXT:
{context}- Feedback on last week: {difficulty}
- Current weight: {weight:.1} kg
- Notes / issues: {notes}

WORKOUT RULES:
- Do NOT repeat last week's exercises; keep the split but change movements
- At least 2-3 new exercises per day
- Too Easy: harder variations. Just Right: moderate progression. Too Hard: reduce load but still change exercises
{place_rule}

DIET RULES:
- Change meals on at least 5 of 7 days and rotate protein sources
- Use foods available in {city}, {state}; respect the diet type strictly

Title the plan \"Week {week} Fitness Plan\".

{FORMAT_RULES}

PREVIOUS WEEK PLAN (REFERENCE ONLY, DO NOT COPY):
{previous_plan}",
        context = profile_context(profile, preferences),
        difficulty = check_in.difficulty.label(),
        weight = check_in.weight_kg,
        notes = check_in.trimmed_notes().unwrap_or("None"),
        place_rule = workout_place_rule(profile.workout_place),
        city = profile.city,
        state = profile.state,
    );

    let strict = format!(
        "You are a certified fitness coach.

{STRICT_RULES}

Generate the Week {week} plan for a {goal} goal, {diet} diet, training at {place}.
Feedback on last week: {difficulty}.

{FORMAT_RULES}",
        goal = profile.goal.label(),
        diet = profile.diet.label(),
        place = profile.workout_place.label(),
        difficulty = check_in.difficulty.label(),
    );

    PromptPair { primary, strict }
}

/// Prompts for applying a user's change request to the displayed plan.
pub fn modify_plan(profile: &Profile, current_plan: &str, request: &str) -> PromptPair {
    let primary = format!(
        "You are updating an existing fitness plan.

CONTEXT:
- Location: {city}, {state}
- Diet type: {diet}
- Weekly food budget: \u{20B9}{budget}
- Replace expensive or uncommon foods with cheaper local alternatives

RULES:
- Return the COMPLETE plan, including unchanged days
- Workout AND diet must include Day 1: through Day 7:
- Do NOT return partial plans or stop mid-output

{FORMAT_RULES}

CURRENT PLAN:
{current_plan}

USER REQUEST:
{request}

Return the FULL UPDATED PLAN ONLY.",
        city = profile.city,
        state = profile.state,
        diet = profile.diet.label(),
        budget = profile.weekly_budget,
    );

    let strict = format!(
        "Regenerate the FULL 7-day fitness plan.

{STRICT_RULES}

{FORMAT_RULES}

CURRENT PLAN:
{current_plan}"
    );

    PromptPair { primary, strict }
}
