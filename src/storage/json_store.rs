use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{DocumentStore, PantryUpdate};
use crate::error::AppError;
use crate::models::{PantryItem, Profile, Recipe, SavedRecipe};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDocument {
    #[serde(default)]
    profile: Option<Profile>,
    #[serde(default)]
    pantry: Vec<PantryItem>,
    #[serde(default)]
    saved_recipes: Vec<SavedRecipe>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DataBase {
    #[serde(default)]
    users: BTreeMap<String, UserDocument>,
}

/// Whole-database JSON file, rewritten on every mutation.
///
/// All access goes through one `RwLock`, so a pantry update cannot interleave
/// with another write. Mutations are made on a copy of the user's document and
/// only become visible once the file write has succeeded.
#[derive(Debug)]
pub struct JsonFileStore {
    storage_file: Option<PathBuf>,
    storage: RwLock<DataBase>,
}

fn storage_error(context: &str, err: impl std::fmt::Display) -> AppError {
    AppError::Storage(format!("{}: {}", context, err))
}

impl JsonFileStore {
    /// Opens (or creates on first write) the store file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AppError> {
        let storage_file = path.as_ref().to_path_buf();
        let storage = if storage_file.exists() && storage_file.metadata()?.len() > 0 {
            let contents = fs::read_to_string(&storage_file)?;
            let db: DataBase = serde_json::from_str(&contents)
                .map_err(|e| storage_error("Corrupt store file", e))?;
            info!(
                "Loaded {} user documents from {}",
                db.users.len(),
                storage_file.display()
            );
            db
        } else {
            if let Some(parent) = storage_file.parent() {
                fs::create_dir_all(parent)?;
            }
            DataBase::default()
        };

        Ok(Self {
            storage_file: Some(storage_file),
            storage: RwLock::new(storage),
        })
    }

    /// A store that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            storage_file: None,
            storage: RwLock::new(DataBase::default()),
        }
    }

    /// Writes the database to a temp file next to the store and renames it
    /// over the store file, so readers never see a half-written file.
    fn persist(&self, db: &DataBase) -> Result<(), AppError> {
        let Some(path) = &self.storage_file else {
            return Ok(());
        };
        let serialized = serde_json::to_vec_pretty(db)
            .map_err(|e| storage_error("Failed to serialize store", e))?;

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = NamedTempFile::new_in(dir)
            .map_err(|e| storage_error("Failed to create temp store file", e))?;
        staged
            .write_all(&serialized)
            .and_then(|_| staged.as_file().sync_all())
            .map_err(|e| storage_error("Failed to write store file", e))?;
        staged
            .persist(path)
            .map_err(|e| storage_error("Failed to replace store file", e))?;

        debug!("Persisted store to {}", path.display());
        Ok(())
    }

    /// Installs `doc` for `user_id` and persists. On a failed write the
    /// previous document is restored.
    fn commit(&self, db: &mut DataBase, user_id: &str, doc: UserDocument) -> Result<(), AppError> {
        let previous = db.users.insert(user_id.to_string(), doc);
        if let Err(e) = self.persist(db) {
            match previous {
                Some(previous) => db.users.insert(user_id.to_string(), previous),
                None => db.users.remove(user_id),
            };
            return Err(e);
        }
        Ok(())
    }
}

fn user_document(db: &DataBase, user_id: &str) -> UserDocument {
    db.users.get(user_id).cloned().unwrap_or_default()
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn get_profile(&self, user_id: &str) -> Result<Option<Profile>, AppError> {
        let db = self.storage.read().await;
        Ok(db.users.get(user_id).and_then(|doc| doc.profile.clone()))
    }

    async fn put_profile(&self, user_id: &str, profile: Profile) -> Result<(), AppError> {
        let mut db = self.storage.write().await;
        let mut doc = user_document(&db, user_id);
        doc.profile = Some(profile);
        self.commit(&mut db, user_id, doc)
    }

    async fn get_pantry(&self, user_id: &str) -> Result<Vec<PantryItem>, AppError> {
        let db = self.storage.read().await;
        Ok(db
            .users
            .get(user_id)
            .map(|doc| doc.pantry.clone())
            .unwrap_or_default())
    }

    async fn update_pantry(
        &self,
        user_id: &str,
        update: PantryUpdate,
    ) -> Result<Vec<PantryItem>, AppError> {
        let mut db = self.storage.write().await;
        let mut doc = user_document(&db, user_id);
        doc.pantry = update(std::mem::take(&mut doc.pantry));
        let pantry = doc.pantry.clone();
        self.commit(&mut db, user_id, doc)?;
        Ok(pantry)
    }

    async fn save_recipe(&self, user_id: &str, recipe: Recipe) -> Result<SavedRecipe, AppError> {
        let mut db = self.storage.write().await;
        let saved = SavedRecipe::new(recipe, Utc::now());
        let mut doc = user_document(&db, user_id);
        doc.saved_recipes.push(saved.clone());
        self.commit(&mut db, user_id, doc)?;
        Ok(saved)
    }

    async fn list_saved_recipes(&self, user_id: &str) -> Result<Vec<SavedRecipe>, AppError> {
        let db = self.storage.read().await;
        let mut recipes = db
            .users
            .get(user_id)
            .map(|doc| doc.saved_recipes.clone())
            .unwrap_or_default();
        recipes.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        Ok(recipes)
    }

    async fn delete_saved_recipe(&self, user_id: &str, recipe_id: &str) -> Result<bool, AppError> {
        let mut db = self.storage.write().await;
        let Some(mut doc) = db.users.get(user_id).cloned() else {
            return Ok(false);
        };
        let before = doc.saved_recipes.len();
        doc.saved_recipes.retain(|r| r.recipe_id != recipe_id);
        if doc.saved_recipes.len() == before {
            return Ok(false);
        }
        self.commit(&mut db, user_id, doc)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pantry_merger::merge_pantry_items;
    use tempfile::tempdir;

    fn recipe(name: &str) -> Recipe {
        serde_json::from_value(serde_json::json!({ "name": name })).unwrap()
    }

    #[tokio::test]
    async fn test_profile_absent_then_written() {
        let store = JsonFileStore::in_memory();
        assert_eq!(store.get_profile("u1").await.unwrap(), None);

        let profile = Profile {
            name: "Sam".to_string(),
            ..Profile::default()
        };
        store.put_profile("u1", profile.clone()).await.unwrap();
        assert_eq!(store.get_profile("u1").await.unwrap(), Some(profile));
        assert_eq!(store.get_profile("u2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_update_pantry_returns_stored_value() {
        let store = JsonFileStore::in_memory();
        let pantry = store
            .update_pantry(
                "u1",
                Box::new(|p| merge_pantry_items(p, vec![PantryItem::new("egg", "12")])),
            )
            .await
            .unwrap();
        assert_eq!(pantry, vec![PantryItem::new("egg", "12")]);
        assert_eq!(store.get_pantry("u1").await.unwrap(), pantry);
    }

    #[tokio::test]
    async fn test_saved_recipes_newest_first_and_delete() {
        let store = JsonFileStore::in_memory();
        let first = store.save_recipe("u1", recipe("Soup")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = store.save_recipe("u1", recipe("Salad")).await.unwrap();

        let listed = store.list_saved_recipes("u1").await.unwrap();
        assert_eq!(listed[0].recipe_id, second.recipe_id);
        assert_eq!(listed[1].recipe_id, first.recipe_id);

        assert!(store.delete_saved_recipe("u1", &first.recipe_id).await.unwrap());
        assert!(!store.delete_saved_recipe("u1", &first.recipe_id).await.unwrap());
        assert!(!store.delete_saved_recipe("nobody", "x").await.unwrap());
        assert_eq!(store.list_saved_recipes("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        {
            let store = JsonFileStore::open(&path).unwrap();
            store
                .update_pantry("u1", Box::new(|_: Vec<PantryItem>| vec![PantryItem::new("rice", "2 lb")]))
                .await
                .unwrap();
            store.save_recipe("u1", recipe("Fried Rice")).await.unwrap();
        }

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(
            reopened.get_pantry("u1").await.unwrap(),
            vec![PantryItem::new("rice", "2 lb")]
        );
        let saved = reopened.list_saved_recipes("u1").await.unwrap();
        assert_eq!(saved[0].recipe.name, "Fried Rice");
    }

    /// Replaces the store file with a directory so the next rename fails.
    fn break_store_file(path: &Path) {
        std::fs::remove_file(path).unwrap();
        std::fs::create_dir(path).unwrap();
    }

    #[tokio::test]
    async fn test_failed_write_leaves_memory_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = JsonFileStore::open(&path).unwrap();
        store
            .update_pantry("u1", Box::new(|_: Vec<PantryItem>| vec![PantryItem::new("rice", "2 lb")]))
            .await
            .unwrap();
        let kept = store.save_recipe("u1", recipe("Soup")).await.unwrap();

        break_store_file(&path);

        let result = store
            .update_pantry(
                "u1",
                Box::new(|p| merge_pantry_items(p, vec![PantryItem::new("egg", "12")])),
            )
            .await;
        assert!(matches!(result, Err(AppError::Storage(_))));
        assert_eq!(
            store.get_pantry("u1").await.unwrap(),
            vec![PantryItem::new("rice", "2 lb")]
        );

        assert!(store.save_recipe("u1", recipe("Salad")).await.is_err());
        assert!(store.delete_saved_recipe("u1", &kept.recipe_id).await.is_err());
        let saved = store.list_saved_recipes("u1").await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].recipe_id, kept.recipe_id);

        assert!(store.put_profile("u2", Profile::default()).await.is_err());
        assert_eq!(store.get_profile("u2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_persist_leaves_no_temp_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = JsonFileStore::open(&path).unwrap();
        store.save_recipe("u1", recipe("Soup")).await.unwrap();
        store.save_recipe("u1", recipe("Stew")).await.unwrap();

        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        assert!(JsonFileStore::open(&path).is_ok());
    }

    #[test]
    fn test_corrupt_file_is_storage_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(JsonFileStore::open(&path), Err(AppError::Storage(_))));
    }
}
