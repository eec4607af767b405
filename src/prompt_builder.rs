use crate::models::PantryItem;

/// Number of recipes requested per generation call.
pub const RECIPES_PER_REQUEST: usize = 3;

const NONE_SPECIFIED: &str = "none specified";

const RECIPE_OUTPUT_FORMAT: &str = r#"OUTPUT FORMAT:
Respond ONLY with a JSON object. Do not include any explanatory text before or after it.
The JSON object must have exactly this shape:
{
  "recipes": [
    {
      "name": "Garlic Butter Chicken",
      "description": "Pan-seared chicken in a rich garlic butter sauce.",
      "prepTime": "10 minutes",
      "cookTime": "20 minutes",
      "difficulty": "easy",
      "servings": 4,
      "ingredients": ["4 chicken breasts", "3 cloves garlic, minced", "2 tbsp butter"],
      "instructions": ["Season the chicken.", "Sear for 6 minutes per side.", "Add garlic and butter and baste."],
      "allergenWarning": "None",
      "dietaryTags": ["gluten-free", "high-protein"]
    }
  ]
}
"difficulty" must be one of "easy", "medium" or "hard".
"allergenWarning" must be "None" unless the recipe contains one of the listed allergens."#;

fn enumerate(out: &mut String, items: &[String]) {
    for (index, item) in items.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", index + 1, item));
    }
}

fn list_or_none(items: &[String]) -> String {
    if items.is_empty() {
        NONE_SPECIFIED.to_string()
    } else {
        items.join(", ")
    }
}

/// Renders the recipe-generation prompt. Pure: the same inputs always give the same text.
pub fn build_recipe_prompt(
    ingredients: &[PantryItem],
    allergies: &[String],
    dietary_preferences: &[String],
    user_name: &str,
) -> String {
    let user_name = user_name.trim();
    let cook = if user_name.is_empty() {
        "a home cook"
    } else {
        user_name
    };

    let mut prompt = format!(
        "You are a helpful chef assistant creating personalized recipes for {}.\n\n",
        cook
    );

    if !allergies.is_empty() {
        prompt.push_str("ALLERGIES (these ingredients must NEVER appear):\n");
        enumerate(&mut prompt, allergies);
        prompt.push('\n');
    }

    if !dietary_preferences.is_empty() {
        prompt.push_str("DIETARY PREFERENCES (every recipe must respect these):\n");
        enumerate(&mut prompt, dietary_preferences);
        prompt.push('\n');
    }

    if ingredients.is_empty() {
        prompt.push_str(&format!(
            "No pantry ingredients were provided. Suggest {} popular recipes that use common household ingredients.\n\n",
            RECIPES_PER_REQUEST
        ));
    } else {
        prompt.push_str("AVAILABLE INGREDIENTS:\n");
        for (index, item) in ingredients.iter().enumerate() {
            if item.quantity.trim().is_empty() {
                prompt.push_str(&format!("{}. {}\n", index + 1, item.name));
            } else {
                prompt.push_str(&format!("{}. {} ({})\n", index + 1, item.name, item.quantity.trim()));
            }
        }
        prompt.push_str(&format!(
            "\nCreate {} recipes that primarily use the available ingredients. You may assume basic staples (salt, pepper, oil, water).\n\n",
            RECIPES_PER_REQUEST
        ));
    }

    prompt.push_str(&format!(
        "SAFETY RULES:\n\
         - Do NOT include any of these allergens or ingredients derived from them: {}\n\
         - Follow these dietary preferences strictly: {}\n\
         - If a recipe cannot avoid an allergen, do not suggest it.\n\n",
        list_or_none(allergies),
        list_or_none(dietary_preferences)
    ));

    prompt.push_str(RECIPE_OUTPUT_FORMAT);
    prompt
}

/// Renders the prompt that turns raw receipt OCR text into pantry items.
pub fn build_receipt_prompt(ocr_text: &str) -> String {
    format!(
        r#"You are a grocery receipt parser. The following text was extracted from a grocery receipt with OCR and may contain errors and abbreviations.

RECEIPT TEXT:
"""
{}
"""

Identify the food items on this receipt. Expand abbreviations into plain ingredient names (for example "GRND BEEF" becomes "ground beef").
Ignore totals, taxes, discounts, store information and non-food items.
Respond ONLY with a JSON array, with no text before or after it, in this shape:
[
  {{"name": "ground beef", "quantity": "2.5 lb"}},
  {{"name": "milk", "quantity": "1 gal"}}
]
Use an empty string for "quantity" when the receipt does not state one."#,
        ocr_text.trim()
    )
}
