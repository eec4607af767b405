use axum::extract::FromRequest;

use crate::error::AppError;

/// `axum::Json` whose rejections come back in the usual error envelope
/// instead of axum's plain-text body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
