use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default, alias = "dietaryPreferences")]
    pub dietary_restrictions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub preferences: Preferences,
}

impl Profile {
    /// Trims every field and drops blank allergy/restriction entries.
    pub fn normalized(self) -> Self {
        fn clean(list: Vec<String>) -> Vec<String> {
            list.into_iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        }

        Self {
            name: self.name.trim().to_string(),
            bio: self.bio.trim().to_string(),
            preferences: Preferences {
                allergies: clean(self.preferences.allergies),
                dietary_restrictions: clean(self.preferences.dietary_restrictions),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PantryItem {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub quantity: String,
}

impl PantryItem {
    pub fn new(name: impl Into<String>, quantity: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity: quantity.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "easy" => Difficulty::Easy,
            "hard" => Difficulty::Hard,
            _ => Difficulty::Medium,
        }
    }
}

// Models sometimes answer "Easy", "moderate" or nothing at all.
impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        Ok(value.as_str().map(Difficulty::from_label).unwrap_or_default())
    }
}

/// A generated recipe. Decoding is lenient because the source is model output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub prep_time: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub cook_time: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default, deserialize_with = "lenient_string")]
    pub servings: String,
    #[serde(default)]
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub allergen_warning: String,
    #[serde(default)]
    pub dietary_tags: Vec<String>,
    #[serde(default)]
    pub is_safe: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedRecipe {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub recipe_id: String,
    pub saved_at: DateTime<Utc>,
}

impl SavedRecipe {
    pub fn new(recipe: Recipe, saved_at: DateTime<Utc>) -> Self {
        let recipe_id = recipe_id_for(&recipe.name, saved_at);
        Self {
            recipe,
            recipe_id,
            saved_at,
        }
    }
}

/// `<slug>-<unix millis>`. Two saves of the same name in the same millisecond collide.
pub fn recipe_id_for(name: &str, saved_at: DateTime<Utc>) -> String {
    format!("{}-{}", slugify(name), saved_at.timestamp_millis())
}

pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "recipe".to_string()
    } else {
        slug.to_string()
    }
}

/// Accepts strings, numbers, booleans and null, always producing a string.
fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    })
}
