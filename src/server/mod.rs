pub mod extract;
pub mod routes;
pub mod state;
pub mod user;

use anyhow::{Context, Result};
use axum::{
    extract::DefaultBodyLimit,
    http::{header::CONTENT_TYPE, HeaderName, Method},
    routing::{delete, get, post},
    Router,
};
use std::time::Duration;
use tokio::{net::TcpListener, signal};
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::receipt_extractor::MAX_RECEIPT_BYTES;
use routes::*;
pub use state::AppState;

// Room for multipart boundaries and headers around a maximum-size image.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(user::USER_ID_HEADER)])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/api/test", get(test_handler))
        .route("/api/profile", get(get_profile_handler).post(save_profile_handler))
        .route("/api/pantry", get(get_pantry_handler).post(add_pantry_items_handler))
        .route("/api/pantry/{name}", delete(delete_pantry_item_handler))
        .route(
            "/api/pantry/receipt",
            post(upload_receipt_handler)
                .layer(DefaultBodyLimit::max(MAX_RECEIPT_BYTES + MULTIPART_OVERHEAD)),
        )
        .route("/api/generate-recipes", post(generate_recipes_handler))
        .route("/api/recipes/save", post(save_recipe_handler))
        .route("/api/recipes/saved", get(list_saved_recipes_handler))
        .route("/api/recipes/save/{recipe_id}", delete(delete_saved_recipe_handler))
        .layer(cors)
        .with_state(state)
}

pub async fn start_server(state: AppState, port: u16) -> Result<()> {
    let app = router(state);

    let address = format!("0.0.0.0:{port}");
    info!("Binding to {address}");
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
