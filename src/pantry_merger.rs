use crate::models::PantryItem;

fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

fn merge_quantity(existing: &str, incoming: &str) -> String {
    match (existing.trim().is_empty(), incoming.trim().is_empty()) {
        (false, false) => format!("{}, {}", existing.trim(), incoming.trim()),
        (true, false) => incoming.trim().to_string(),
        _ => existing.to_string(),
    }
}

/// Merges freshly extracted items into an existing, name-unique pantry.
///
/// Existing items keep their order and spelling; unseen items are appended in
/// the order they arrive. Matching is by trimmed, lowercased name, and
/// matching quantities are concatenated (`"12, 6"`).
pub fn merge_pantry_items(existing: Vec<PantryItem>, new_items: Vec<PantryItem>) -> Vec<PantryItem> {
    let mut merged = existing;

    for item in new_items {
        let key = name_key(&item.name);
        if key.is_empty() {
            continue;
        }

        match merged.iter_mut().find(|e| name_key(&e.name) == key) {
            Some(found) => {
                found.quantity = merge_quantity(&found.quantity, &item.quantity);
            }
            None => merged.push(PantryItem {
                name: item.name.trim().to_string(),
                quantity: item.quantity.trim().to_string(),
            }),
        }
    }

    merged
}

/// Removes the item with the given case-insensitive name. Returns whether one was removed.
pub fn remove_pantry_item(pantry: &mut Vec<PantryItem>, name: &str) -> bool {
    let key = name_key(name);
    let before = pantry.len();
    pantry.retain(|item| name_key(&item.name) != key);
    pantry.len() != before
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pantry() -> Vec<PantryItem> {
        vec![
            PantryItem::new("egg", "12"),
            PantryItem::new("Milk", ""),
            PantryItem::new("rice", "2 lb"),
        ]
    }

    #[test]
    fn test_merge_empty_new_items_is_identity() {
        assert_eq!(merge_pantry_items(pantry(), vec![]), pantry());
    }

    #[test]
    fn test_merge_into_empty_pantry() {
        let new_items = vec![PantryItem::new("flour", "1 kg"), PantryItem::new("sugar", "")];
        assert_eq!(merge_pantry_items(vec![], new_items.clone()), new_items);
    }

    #[test]
    fn test_merge_dedup_concatenates_quantities() {
        let merged = merge_pantry_items(
            vec![PantryItem::new("egg", "12")],
            vec![PantryItem::new("Egg", "6")],
        );
        assert_eq!(merged, vec![PantryItem::new("egg", "12, 6")]);
    }

    #[test]
    fn test_merge_keeps_whichever_quantity_is_present() {
        let merged = merge_pantry_items(
            pantry(),
            vec![PantryItem::new("MILK", "1 gal"), PantryItem::new("Rice", "")],
        );
        assert_eq!(merged[1], PantryItem::new("Milk", "1 gal"));
        assert_eq!(merged[2], PantryItem::new("rice", "2 lb"));
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_merge_appends_new_items_in_order_and_dedups_within_batch() {
        let merged = merge_pantry_items(
            pantry(),
            vec![
                PantryItem::new("beef", "1 lb"),
                PantryItem::new("apple", "3"),
                PantryItem::new("Beef", "2 lb"),
                PantryItem::new("  ", "5"),
            ],
        );
        let names: Vec<_> = merged.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["egg", "Milk", "rice", "beef", "apple"]);
        assert_eq!(merged[3].quantity, "1 lb, 2 lb");
    }

    #[test]
    fn test_remove_pantry_item_case_insensitive() {
        let mut items = pantry();
        assert!(remove_pantry_item(&mut items, "MILK"));
        assert!(!remove_pantry_item(&mut items, "butter"));
        assert_eq!(items.len(), 2);
    }
}
