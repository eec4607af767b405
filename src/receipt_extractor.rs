//! Turns receipt OCR text into pantry items.
//!
//! The model does the real work. When it fails for any reason a keyword line
//! scanner takes over; it is deliberately crude and only exists so a receipt
//! upload still produces something.
//!
//! Food keywords match as substrings, so non-food lines can slip through:
//! "ham" hits SHAMPOO, "oil" hits FOIL, "rice" hits PRICE.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use tracing::{info, warn};

use crate::api_connection::TextCompletion;
use crate::error::AppError;
use crate::models::PantryItem;
use crate::ocr::OcrEngine;
use crate::pantry_merger::merge_pantry_items;
use crate::prompt_builder::build_receipt_prompt;
use crate::response_parser::parse_pantry_items;
use crate::storage::DocumentStore;

pub const MAX_FALLBACK_ITEMS: usize = 20;
pub const MAX_RECEIPT_BYTES: usize = 10 * 1024 * 1024;

const SKIP_KEYWORDS: &[&str] = &["total", "subtotal", "tax"];

const FOOD_KEYWORDS: &[&str] = &[
    "apple", "avocado", "bacon", "banana", "bean", "beef", "berr", "bread", "broccoli", "butter",
    "carrot", "cereal", "cheese", "chicken", "corn", "cream", "cucumber", "egg", "fish", "flour",
    "garlic", "ham", "juice", "lemon", "lettuce", "lime", "milk", "mushroom", "oat", "oil",
    "onion", "orange", "pasta", "pepper", "pork", "potato", "rice", "salmon", "sausage",
    "spinach", "sugar", "tomato", "tortilla", "tuna", "turkey", "yogurt",
];

static UNIT_QUANTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d+(?:\.\d+)?)\s*(lbs|lb|oz|kg|g|ct)\b").expect("valid unit quantity regex")
});

static LEADING_QUANTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+(?:\.\d+)?)\s+").expect("valid leading quantity regex"));

static TRAILING_PRICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$?\d+\.\d{2}\s*[A-Za-z]?\s*$").expect("valid price regex"));

static NON_NAME_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9&' -]").expect("valid name filter regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionSource {
    Ai,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Extraction {
    pub items: Vec<PantryItem>,
    pub source: ExtractionSource,
}

fn is_skipped(line: &str) -> bool {
    let lower = line.to_lowercase();
    line.len() < 3 || SKIP_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// Scans a single receipt line. Returns `None` for lines that do not look like food.
pub fn scan_line(line: &str) -> Option<PantryItem> {
    let line = line.trim();
    if is_skipped(line) {
        return None;
    }

    let without_price = TRAILING_PRICE.replace(line, "");

    let (quantity, rest) = if let Some(caps) = UNIT_QUANTITY.captures(&without_price) {
        let quantity = format!("{} {}", &caps[1], caps[2].to_lowercase());
        (quantity, UNIT_QUANTITY.replace(&without_price, " ").into_owned())
    } else if let Some(caps) = LEADING_QUANTITY.captures(&without_price) {
        let quantity = caps[1].to_string();
        (quantity, LEADING_QUANTITY.replace(&without_price, "").into_owned())
    } else {
        (String::new(), without_price.into_owned())
    };

    let name = NON_NAME_CHARS.replace_all(&rest.to_lowercase(), " ").into_owned();
    let name = name.split_whitespace().collect::<Vec<_>>().join(" ");

    if name.len() < 2 || !FOOD_KEYWORDS.iter().any(|k| name.contains(k)) {
        return None;
    }

    Some(PantryItem { name, quantity })
}

/// Keyword line scanner used when the model path fails. Never returns more than
/// [`MAX_FALLBACK_ITEMS`] items.
pub fn fallback_extract(ocr_text: &str) -> Vec<PantryItem> {
    ocr_text
        .lines()
        .filter_map(scan_line)
        .take(MAX_FALLBACK_ITEMS)
        .collect()
}

async fn ai_extract(model: &dyn TextCompletion, ocr_text: &str) -> Result<Vec<PantryItem>, AppError> {
    let raw = model.complete(&build_receipt_prompt(ocr_text)).await?;
    parse_pantry_items(&raw)
}

/// Extracts pantry items from OCR text, falling back to the line scanner on any model failure.
pub async fn extract_ingredients(model: &dyn TextCompletion, ocr_text: &str) -> Extraction {
    match ai_extract(model, ocr_text).await {
        Ok(items) => {
            info!("Model extracted {} receipt items", items.len());
            Extraction {
                items,
                source: ExtractionSource::Ai,
            }
        }
        Err(e) => {
            warn!("Model receipt extraction failed, using keyword scanner: {e}");
            Extraction {
                items: fallback_extract(ocr_text),
                source: ExtractionSource::Fallback,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceiptOutcome {
    pub extracted: Vec<PantryItem>,
    pub source: ExtractionSource,
    pub pantry: Vec<PantryItem>,
}

/// Full receipt flow: validate upload, OCR, extract, merge into the stored pantry.
pub async fn process_receipt(
    store: &dyn DocumentStore,
    ocr: &dyn OcrEngine,
    model: &dyn TextCompletion,
    user_id: &str,
    content_type: &str,
    image: &[u8],
) -> Result<ReceiptOutcome, AppError> {
    if !content_type.starts_with("image/") {
        return Err(AppError::Validation(format!(
            "Receipt must be an image, got '{}'",
            content_type
        )));
    }
    if image.is_empty() {
        return Err(AppError::Validation("Receipt image is empty".to_string()));
    }
    if image.len() > MAX_RECEIPT_BYTES {
        return Err(AppError::Validation(format!(
            "Receipt image too large. Maximum size is {} bytes",
            MAX_RECEIPT_BYTES
        )));
    }

    let text = ocr.recognize(image).await?;
    info!("OCR produced {} characters for user {}", text.len(), user_id);

    let extraction = extract_ingredients(model, &text).await;
    let extracted = extraction.items.clone();

    let pantry = store
        .update_pantry(user_id, Box::new(move |existing| merge_pantry_items(existing, extracted)))
        .await?;

    Ok(ReceiptOutcome {
        extracted: extraction.items,
        source: extraction.source,
        pantry,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_connection::FakeCompletion;

    #[test]
    fn test_total_line_discarded() {
        assert_eq!(scan_line("TOTAL   $45.67"), None);
        assert_eq!(scan_line("SUBTOTAL 40.00"), None);
        assert_eq!(scan_line("TAX 1.23"), None);
        assert_eq!(scan_line("eg"), None);
    }

    #[test]
    fn test_keyword_substrings_let_non_food_through() {
        assert_eq!(scan_line("SHAMPOO 4.99").unwrap().name, "shampoo");
        assert_eq!(scan_line("ALUM FOIL 3.29").unwrap().name, "alum foil");
        assert_eq!(scan_line("PAPER TOWELS 5.99"), None);
    }

    #[test]
    fn test_beef_line_yields_name_and_quantity() {
        let item = scan_line("GRND BEEF 2.5 LB   $9.99").unwrap();
        assert!(item.name.contains("beef"));
        assert_eq!(item.quantity, "2.5 lb");
        assert_eq!(item.name, "grnd beef");
    }

    #[test]
    fn test_leading_count_quantity() {
        let item = scan_line("2 BANANAS 0.98").unwrap();
        assert_eq!(item, PantryItem::new("bananas", "2"));
    }

    #[test]
    fn test_non_food_line_dropped() {
        assert_eq!(scan_line("PAPER TOWELS 6 CT  $7.49"), None);
        assert_eq!(scan_line("THANK YOU FOR SHOPPING"), None);
    }

    #[test]
    fn test_fallback_caps_output() {
        let text = (0..50)
            .map(|i| format!("WHOLE MILK {} OZ $3.49", i + 1))
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(fallback_extract(&text).len(), MAX_FALLBACK_ITEMS);
    }

    #[tokio::test]
    async fn test_extract_prefers_model() {
        let model = FakeCompletion::new()
            .with_response("receipt", r#"[{"name": "ground beef", "quantity": "2.5 lb"}]"#);
        let extraction = extract_ingredients(&model, "GRND BEEF 2.5 LB $9.99").await;
        assert_eq!(extraction.source, ExtractionSource::Ai);
        assert_eq!(extraction.items, vec![PantryItem::new("ground beef", "2.5 lb")]);
    }

    #[tokio::test]
    async fn test_extract_falls_back_on_bad_model_output() {
        let model = FakeCompletion::new().with_response("receipt", "Sorry, I can't read that.");
        let extraction = extract_ingredients(&model, "GRND BEEF 2.5 LB $9.99\nTOTAL $9.99").await;
        assert_eq!(extraction.source, ExtractionSource::Fallback);
        assert_eq!(extraction.items.len(), 1);
    }

    #[tokio::test]
    async fn test_extract_falls_back_on_model_failure() {
        let model = FakeCompletion::new().with_failure("receipt", "connection reset");
        let extraction = extract_ingredients(&model, "EGGS 12 CT 3.99").await;
        assert_eq!(extraction.source, ExtractionSource::Fallback);
        assert_eq!(extraction.items, vec![PantryItem::new("eggs", "12 ct")]);
    }
}
