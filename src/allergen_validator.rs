//! Local allergen screen applied to every generated recipe.
//!
//! Matching is a plain case-insensitive substring test over the joined
//! ingredient lines. It produces false positives ("egg" matches "eggplant")
//! and misses synonyms or translated names. Treat `isSafe` as a best-effort
//! hint, not a guarantee.

use crate::models::Recipe;

pub const NO_ALLERGENS: &str = "None";

/// Allergies declared in `allergies` that occur in the recipe's ingredient lines.
pub fn find_allergens<'a>(recipe: &Recipe, allergies: &'a [String]) -> Vec<&'a str> {
    let haystack = recipe.ingredients.join(" ").to_lowercase();

    allergies
        .iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty() && haystack.contains(&a.to_lowercase()))
        .collect()
}

pub fn allergen_warning(matched: &[&str]) -> String {
    format!("Contains allergens: {}", matched.join(", "))
}

/// Sets `is_safe` and `allergen_warning` on every recipe.
///
/// The local result always wins over whatever the model wrote. With no
/// declared allergies every recipe is marked safe.
pub fn validate_recipes(recipes: Vec<Recipe>, allergies: &[String]) -> Vec<Recipe> {
    recipes
        .into_iter()
        .map(|mut recipe| {
            let matched = find_allergens(&recipe, allergies);
            if matched.is_empty() {
                recipe.is_safe = true;
                recipe.allergen_warning = NO_ALLERGENS.to_string();
            } else {
                recipe.is_safe = false;
                recipe.allergen_warning = allergen_warning(&matched);
            }
            recipe
        })
        .collect()
}
