use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::extract::AppJson;
use super::state::AppState;
use super::user::CurrentUser;
use crate::error::AppError;
use crate::models::{PantryItem, Profile, Recipe, SavedRecipe};
use crate::pantry_merger::{merge_pantry_items, remove_pantry_item};
use crate::receipt_extractor::{process_receipt, ExtractionSource};
use crate::recipe_generator::generate_recipes;

/// Multipart field names accepted for the receipt image.
pub const RECEIPT_FIELDS: &[&str] = &["receipt", "image"];

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub profile: Profile,
}

#[derive(Debug, Serialize)]
pub struct PantryResponse {
    pub success: bool,
    pub pantry: Vec<PantryItem>,
}

#[derive(Debug, Deserialize)]
pub struct AddPantryRequest {
    #[serde(default)]
    pub items: Vec<PantryItem>,
}

#[derive(Debug, Serialize)]
pub struct ReceiptResponse {
    pub success: bool,
    pub extracted: Vec<PantryItem>,
    pub source: ExtractionSource,
    pub pantry: Vec<PantryItem>,
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub ingredients: Option<Vec<PantryItem>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    pub recipes: Vec<Recipe>,
    pub user_profile: Profile,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRecipeResponse {
    pub success: bool,
    pub recipe_id: String,
}

#[derive(Debug, Serialize)]
pub struct SavedRecipesResponse {
    pub success: bool,
    pub recipes: Vec<SavedRecipe>,
}

pub async fn test_handler() -> Json<Value> {
    Json(json!({ "message": "API is working!" }))
}

pub async fn get_profile_handler(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = state.store.get_profile(&user_id).await?.unwrap_or_default();
    Ok(Json(ProfileResponse {
        success: true,
        profile,
    }))
}

pub async fn save_profile_handler(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    AppJson(profile): AppJson<Profile>,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = profile.normalized();
    state.store.put_profile(&user_id, profile.clone()).await?;
    info!("Saved profile for {}", user_id);
    Ok(Json(ProfileResponse {
        success: true,
        profile,
    }))
}

pub async fn get_pantry_handler(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<PantryResponse>, AppError> {
    let pantry = state.store.get_pantry(&user_id).await?;
    Ok(Json(PantryResponse {
        success: true,
        pantry,
    }))
}

pub async fn add_pantry_items_handler(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    AppJson(request): AppJson<AddPantryRequest>,
) -> Result<Json<PantryResponse>, AppError> {
    if request.items.iter().all(|item| item.name.trim().is_empty()) {
        return Err(AppError::Validation(
            "At least one item with a name is required".to_string(),
        ));
    }

    let items = request.items;
    let pantry = state
        .store
        .update_pantry(&user_id, Box::new(move |existing| merge_pantry_items(existing, items)))
        .await?;
    Ok(Json(PantryResponse {
        success: true,
        pantry,
    }))
}

pub async fn delete_pantry_item_handler(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(name): Path<String>,
) -> Result<Json<PantryResponse>, AppError> {
    let mut current = state.store.get_pantry(&user_id).await?;
    if !remove_pantry_item(&mut current, &name) {
        return Err(AppError::NotFound(format!("Pantry item '{}' not found", name)));
    }

    let pantry = state
        .store
        .update_pantry(
            &user_id,
            Box::new(move |mut existing| {
                remove_pantry_item(&mut existing, &name);
                existing
            }),
        )
        .await?;
    Ok(Json(PantryResponse {
        success: true,
        pantry,
    }))
}

pub async fn upload_receipt_handler(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ReceiptResponse>, AppError> {
    let mut multipart = multipart?;
    let malformed = |e: axum::extract::multipart::MultipartError| {
        AppError::Validation(format!("Failed to read multipart data: {}", e))
    };

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        if !field.name().is_some_and(|name| RECEIPT_FIELDS.contains(&name)) {
            continue;
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let image = field.bytes().await.map_err(malformed)?;

        let outcome = process_receipt(
            state.store.as_ref(),
            state.ocr.as_ref(),
            state.model.as_ref(),
            &user_id,
            &content_type,
            &image,
        )
        .await?;

        return Ok(Json(ReceiptResponse {
            success: true,
            extracted: outcome.extracted,
            source: outcome.source,
            pantry: outcome.pantry,
        }));
    }

    Err(AppError::Validation("No receipt image provided".to_string()))
}

pub async fn generate_recipes_handler(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    AppJson(request): AppJson<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    let outcome = generate_recipes(
        state.store.as_ref(),
        state.model.as_ref(),
        &user_id,
        request.ingredients,
    )
    .await?;

    Ok(Json(GenerateResponse {
        success: true,
        recipes: outcome.recipes,
        user_profile: outcome.user_profile,
    }))
}

pub async fn save_recipe_handler(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    AppJson(body): AppJson<Value>,
) -> Result<Json<SaveRecipeResponse>, AppError> {
    let recipe: Recipe = serde_json::from_value(body)
        .map_err(|e| AppError::Validation(format!("Invalid recipe: {}", e)))?;
    if recipe.name.trim().is_empty() {
        return Err(AppError::Validation("Recipe name is required".to_string()));
    }

    let saved = state.store.save_recipe(&user_id, recipe).await?;
    info!("Saved recipe {} for {}", saved.recipe_id, user_id);
    Ok(Json(SaveRecipeResponse {
        success: true,
        recipe_id: saved.recipe_id,
    }))
}

pub async fn list_saved_recipes_handler(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<SavedRecipesResponse>, AppError> {
    let recipes = state.store.list_saved_recipes(&user_id).await?;
    Ok(Json(SavedRecipesResponse {
        success: true,
        recipes,
    }))
}

pub async fn delete_saved_recipe_handler(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(recipe_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    if !state.store.delete_saved_recipe(&user_id, &recipe_id).await? {
        return Err(AppError::NotFound(format!("Saved recipe '{}' not found", recipe_id)));
    }
    info!("Deleted recipe {} for {}", recipe_id, user_id);
    Ok(Json(json!({ "success": true })))
}
