//! Defensive parsing of model output.
//!
//! Models are asked for bare JSON but regularly wrap it in markdown fences or
//! answer with prose. Everything here either yields typed data or an
//! [`AppError::AiFormat`] that keeps the raw text for the client.

use serde_json::Value;
use tracing::debug;

use crate::error::AppError;
use crate::models::{PantryItem, Recipe};

/// Removes every "```json" / "```" fence and trims the remainder.
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "")
        .trim()
        .to_string()
}

fn format_error(reason: impl ToString, raw: &str) -> AppError {
    AppError::AiFormat {
        reason: reason.to_string(),
        raw: raw.to_string(),
    }
}

/// Strips fences and parses the remainder as JSON.
pub fn parse_ai_json(raw: &str) -> Result<Value, AppError> {
    let content = strip_code_fences(raw);
    debug!("Model content after fence stripping:\n---\n{}\n---", content);

    if content.is_empty() {
        return Err(format_error("response was empty", raw));
    }

    serde_json::from_str(&content).map_err(|e| format_error(e, raw))
}

/// Returns the array under `key` in a wrapper object, or the value itself when it is a bare array.
fn unwrap_array(value: Value, key: &str) -> Option<Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(mut map) => match map.remove(key) {
            Some(Value::Array(items)) => Some(items),
            _ => None,
        },
        _ => None,
    }
}

/// Parses `{"recipes": [...]}` or a bare array of recipes.
pub fn parse_recipes(raw: &str) -> Result<Vec<Recipe>, AppError> {
    let value = parse_ai_json(raw)?;
    let items = unwrap_array(value, "recipes")
        .ok_or_else(|| format_error("expected a recipes array", raw))?;

    items
        .into_iter()
        .map(|item| serde_json::from_value::<Recipe>(item).map_err(|e| format_error(e, raw)))
        .collect()
}

/// Parses a bare array (or `{"ingredients": [...]}`) of `{name, quantity}` entries.
pub fn parse_pantry_items(raw: &str) -> Result<Vec<PantryItem>, AppError> {
    let value = parse_ai_json(raw)?;
    let items = unwrap_array(value, "ingredients")
        .ok_or_else(|| format_error("expected an array of ingredients", raw))?;

    items
        .into_iter()
        .map(|item| serde_json::from_value::<PantryItem>(item).map_err(|e| format_error(e, raw)))
        .collect()
}
