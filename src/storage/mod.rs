//! Per-user document storage.

pub mod json_store;

pub use json_store::JsonFileStore;

use async_trait::async_trait;
use std::fmt;

use crate::error::AppError;
use crate::models::{PantryItem, Profile, Recipe, SavedRecipe};

/// Transformation applied to a pantry under the store's write lock.
pub type PantryUpdate = Box<dyn FnOnce(Vec<PantryItem>) -> Vec<PantryItem> + Send>;

/// Documents keyed by user id: one profile, one pantry and an ordered
/// collection of saved recipes per user.
#[async_trait]
pub trait DocumentStore: Send + Sync + fmt::Debug {
    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, AppError>;

    async fn put_profile(&self, user_id: &str, profile: Profile) -> Result<(), AppError>;

    async fn get_pantry(&self, user_id: &str) -> Result<Vec<PantryItem>, AppError>;

    /// Read-modify-write of a pantry. Returns the stored result.
    async fn update_pantry(
        &self,
        user_id: &str,
        update: PantryUpdate,
    ) -> Result<Vec<PantryItem>, AppError>;

    /// Stores a recipe, assigning `recipeId` and `savedAt`.
    async fn save_recipe(&self, user_id: &str, recipe: Recipe) -> Result<SavedRecipe, AppError>;

    /// Saved recipes, newest first.
    async fn list_saved_recipes(&self, user_id: &str) -> Result<Vec<SavedRecipe>, AppError>;

    /// Returns whether a recipe with that id existed.
    async fn delete_saved_recipe(&self, user_id: &str, recipe_id: &str) -> Result<bool, AppError>;
}
