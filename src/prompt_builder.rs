//! Prompt text for the two kinds of completion request: short placeholder
//! suggestions and full recipe generation. Everything here is pure.

use chrono::NaiveDate;

use crate::location::PlaceDescriptor;
use crate::location::UNKNOWN;
use crate::model::{PreferenceSlot, SuggestionHistory, UserPreferences};

/// System role sent with suggestion requests.
pub const SUGGESTION_SYSTEM_ROLE: &str = "assistant";

/// System role sent with recipe generation requests.
pub const CHEF_SYSTEM_ROLE: &str = "You are a helpful ai chef assistant who generates new recipes and suggests recipes based on various factors about a person";

/// Output format forwarded to the model; the renderer expects markdown.
pub const RECIPE_FORMAT_NOTICE: &str =
    "NOTICE return everything in markdown to be rendered in html. only give me the recipe and nothing else";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuggestionKind {
    #[default]
    RecipeName,
    IngredientList,
}

fn location_clause(place: &PlaceDescriptor) -> Option<String> {
    let known: Vec<&str> = [&place.city, &place.region, &place.country]
        .into_iter()
        .map(String::as_str)
        .filter(|field| *field != UNKNOWN)
        .collect();
    if known.is_empty() {
        return None;
    }
    Some(format!("the location {}, and ", known.join(", ")))
}

fn exclusion_clause(history: &SuggestionHistory) -> Option<String> {
    if history.is_empty() {
        return None;
    }
    let quoted: Vec<String> = history.iter().map(|entry| format!("\"{}\"", entry)).collect();
    Some(format!(" that doesn't include any of these, exclude: [{}]", quoted.join(", ")))
}

/// Date rendered the way the model sees it, e.g. `Mon Oct 19 2026`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%a %b %d %Y").to_string()
}

pub fn build_suggestion_prompt(place: &PlaceDescriptor, date: NaiveDate, history: &SuggestionHistory) -> String {
    build_suggestion_prompt_for(SuggestionKind::RecipeName, place, date, history)
}

pub fn build_suggestion_prompt_for(
    kind: SuggestionKind,
    place: &PlaceDescriptor,
    date: NaiveDate,
    history: &SuggestionHistory,
) -> String {
    let location = location_clause(place).unwrap_or_default();
    let exclusion = exclusion_clause(history).unwrap_or_default();
    let date = format_date(date);

    match kind {
        SuggestionKind::RecipeName => format!(
            "Given {location}the season based on this date: {date}, \
             suggest me a recipe very different from the ones suggested before{exclusion}. \
             Try to add a lot of variety and detail but heavily bias towards seasonal ingredients, \
             name them without the season though and with the origin at the beginning, \
             and adjectives about the taste. \
             Only respond with one recipe name and nothing else, in the form of \"recipe name\"."
        ),
        SuggestionKind::IngredientList => format!(
            "Given {location}the season based on this date: {date}, \
             suggest a short list of three to five seasonal ingredients that cook well together, \
             very different from the lists suggested before{exclusion}. \
             Name the ingredients without the season. \
             Only respond with one comma-separated list and nothing else, in the form of \"ingredient, ingredient, ingredient\"."
        ),
    }
}

fn preference_clause(preferences: &UserPreferences) -> Option<String> {
    let mut sentences = Vec::new();
    if let Some(meal) = preferences.get(PreferenceSlot::MealType) {
        sentences.push(format!("It should be a {} dish.", meal));
    }
    let flavors: Vec<&str> = [PreferenceSlot::FlavorOne, PreferenceSlot::FlavorTwo]
        .into_iter()
        .filter_map(|slot| preferences.get(slot))
        .collect();
    if !flavors.is_empty() {
        sentences.push(format!("Its flavour should be {}.", flavors.join(" and ")));
    }
    if sentences.is_empty() {
        None
    } else {
        Some(sentences.join(" "))
    }
}

pub fn build_recipe_prompt(input: &str, preferences: &UserPreferences) -> String {
    let mut prompt = String::from(input.trim());
    prompt.push_str("\n\n");
    if let Some(clause) = preference_clause(preferences) {
        prompt.push_str(&clause);
        prompt.push('\n');
    }
    prompt.push_str(
        "Write the recipe with a title, a list of ingredients with quantities, \
         a step-by-step method, and a short note on the history of the dish.\n",
    );
    prompt.push_str(RECIPE_FORMAT_NOTICE);
    prompt
}
