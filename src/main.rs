use anyhow::{Context, Result};
use std::path::Path;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use pantry_chef::cli::{parse_args, Command};
use pantry_chef::config::Config;
use pantry_chef::pantry_import::load_pantry_csv;
use pantry_chef::pantry_merger::merge_pantry_items;
use pantry_chef::receipt_extractor::process_receipt;
use pantry_chef::recipe_generator::generate_recipes;
use pantry_chef::server::state::open_store;
use pantry_chef::server::{start_server, AppState};

fn image_content_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("tif") | Some("tiff") => "image/tiff",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli_args = parse_args();
    let config = Config::load()?;
    let user_for = |user: Option<String>| user.unwrap_or_else(|| config.default_user_id.clone());

    match cli_args.command {
        Command::Serve { port } => {
            let state = AppState::from_config(&config)?;
            start_server(state, port.unwrap_or(config.port)).await?;
        }
        Command::Generate { user } => {
            let state = AppState::from_config(&config)?;
            let user_id = user_for(user);
            let outcome = generate_recipes(state.store.as_ref(), state.model.as_ref(), &user_id, None)
                .await
                .with_context(|| format!("Recipe generation failed for '{}'", user_id))?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Receipt { image, user } => {
            let state = AppState::from_config(&config)?;
            let user_id = user_for(user);
            let bytes = tokio::fs::read(&image)
                .await
                .with_context(|| format!("Failed to read receipt image '{}'", image.display()))?;
            let outcome = process_receipt(
                state.store.as_ref(),
                state.ocr.as_ref(),
                state.model.as_ref(),
                &user_id,
                image_content_type(&image),
                &bytes,
            )
            .await
            .context("Receipt processing failed")?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::ImportPantry { csv, user } => {
            let user_id = user_for(user);
            let items = load_pantry_csv(&csv)?;
            let count = items.len();
            let store = open_store(&config)?;
            let pantry = store
                .update_pantry(&user_id, Box::new(move |existing| merge_pantry_items(existing, items)))
                .await
                .context("Failed to update pantry")?;
            info!("Imported {} rows, pantry now has {} items", count, pantry.len());
            println!("{}", serde_json::to_string_pretty(&pantry)?);
        }
    }

    Ok(())
}
