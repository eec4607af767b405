use anyhow::{Context, Result};
use csv::ReaderBuilder;
use std::io::Read;
use std::path::Path;

use crate::models::PantryItem;

const NAME_COL: &str = "name";
const QUANTITY_COL: &str = "quantity";

/// Reads `name,quantity` rows. Header matching is case-insensitive; the
/// quantity column is optional and rows with a blank name are skipped.
pub fn read_pantry_csv<R: Read>(reader: R) -> Result<Vec<PantryItem>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let name_idx = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(NAME_COL))
        .ok_or_else(|| anyhow::anyhow!("Column '{}' not found", NAME_COL))?;
    let quantity_idx = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case(QUANTITY_COL));

    let mut items = Vec::new();
    for (row_index, result) in rdr.records().enumerate() {
        let record =
            result.with_context(|| format!("Failed to read pantry record at row {}", row_index + 1))?;

        let name = record.get(name_idx).unwrap_or_default().to_string();
        if name.is_empty() {
            continue;
        }
        let quantity = quantity_idx
            .and_then(|idx| record.get(idx))
            .unwrap_or_default()
            .to_string();

        items.push(PantryItem { name, quantity });
    }

    Ok(items)
}

pub fn load_pantry_csv(csv_path: &Path) -> Result<Vec<PantryItem>> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("Failed to open pantry CSV at {:?}", csv_path))?;
    read_pantry_csv(file)
}
