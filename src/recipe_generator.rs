use serde::Serialize;
use tracing::info;

use crate::allergen_validator::validate_recipes;
use crate::api_connection::TextCompletion;
use crate::error::AppError;
use crate::models::{PantryItem, Profile, Recipe};
use crate::prompt_builder::build_recipe_prompt;
use crate::response_parser::parse_recipes;
use crate::storage::DocumentStore;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutcome {
    pub recipes: Vec<Recipe>,
    pub user_profile: Profile,
}

/// Profile → prompt → model → parser → allergen screen.
///
/// `ingredients` of `None` means "use the stored pantry"; an empty list asks
/// for popular recipes instead. Fails with `NotFound` when the user has no
/// profile yet.
pub async fn generate_recipes(
    store: &dyn DocumentStore,
    model: &dyn TextCompletion,
    user_id: &str,
    ingredients: Option<Vec<PantryItem>>,
) -> Result<GenerationOutcome, AppError> {
    let profile = store.get_profile(user_id).await?.ok_or_else(|| {
        AppError::NotFound("User profile not found. Please set up your profile first.".to_string())
    })?;

    let ingredients = match ingredients {
        Some(items) => items,
        None => store.get_pantry(user_id).await?,
    };

    let prompt = build_recipe_prompt(
        &ingredients,
        &profile.preferences.allergies,
        &profile.preferences.dietary_restrictions,
        &profile.name,
    );

    info!(
        "Generating recipes for {} with {} ingredients via {}",
        user_id,
        ingredients.len(),
        model.model_name()
    );
    let raw = model.complete(&prompt).await?;
    let recipes = parse_recipes(&raw)?;
    let recipes = validate_recipes(recipes, &profile.preferences.allergies);

    let unsafe_count = recipes.iter().filter(|r| !r.is_safe).count();
    info!(
        "Generated {} recipes for {} ({} flagged by allergen screen)",
        recipes.len(),
        user_id,
        unsafe_count
    );

    Ok(GenerationOutcome {
        recipes,
        user_profile: profile,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_connection::FakeCompletion;
    use crate::models::Preferences;
    use crate::storage::JsonFileStore;

    const PEANUT_RESPONSE: &str = r#"```json
{"recipes": [
  {"name": "Satay", "ingredients": ["1/2 cup peanut butter", "1 lb chicken"], "allergenWarning": "None"},
  {"name": "Plain Rice", "ingredients": ["1 cup rice"]}
]}
```"#;

    async fn store_with_profile(allergies: &[&str]) -> JsonFileStore {
        let store = JsonFileStore::in_memory();
        let profile = Profile {
            name: "Sam".to_string(),
            bio: String::new(),
            preferences: Preferences {
                allergies: allergies.iter().map(|s| s.to_string()).collect(),
                dietary_restrictions: vec![],
            },
        };
        store.put_profile("u1", profile).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_missing_profile_is_not_found() {
        let store = JsonFileStore::in_memory();
        let model = FakeCompletion::new().with_default_response("[]");
        let result = generate_recipes(&store, &model, "u1", Some(vec![])).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(model.recorded_prompts().is_empty());
    }

    #[tokio::test]
    async fn test_recipes_are_screened_before_returning() {
        let store = store_with_profile(&["peanut"]).await;
        let model = FakeCompletion::new().with_default_response(PEANUT_RESPONSE);

        let outcome = generate_recipes(&store, &model, "u1", Some(vec![PantryItem::new("chicken", "1 lb")]))
            .await
            .unwrap();

        assert_eq!(outcome.recipes.len(), 2);
        assert!(!outcome.recipes[0].is_safe);
        assert!(outcome.recipes[0].allergen_warning.contains("peanut"));
        assert!(outcome.recipes[1].is_safe);
        assert_eq!(outcome.user_profile.name, "Sam");

        let prompt = &model.recorded_prompts()[0];
        assert!(prompt.contains("1. peanut"));
        assert!(prompt.contains("1. chicken (1 lb)"));
    }

    #[tokio::test]
    async fn test_stored_pantry_used_when_ingredients_omitted() {
        let store = store_with_profile(&[]).await;
        store
            .update_pantry("u1", Box::new(|_: Vec<PantryItem>| vec![PantryItem::new("tofu", "1 block")]))
            .await
            .unwrap();
        let model = FakeCompletion::new().with_default_response("[]");

        let outcome = generate_recipes(&store, &model, "u1", None).await.unwrap();
        assert!(outcome.recipes.is_empty());
        assert!(model.recorded_prompts()[0].contains("1. tofu (1 block)"));
    }

    #[tokio::test]
    async fn test_unparseable_output_surfaces_raw_text() {
        let store = store_with_profile(&[]).await;
        let model = FakeCompletion::new().with_default_response("Here are some ideas: pasta!");

        match generate_recipes(&store, &model, "u1", Some(vec![])).await {
            Err(AppError::AiFormat { raw, .. }) => assert_eq!(raw, "Here are some ideas: pasta!"),
            other => panic!("expected AiFormat, got {:?}", other),
        }
    }
}
