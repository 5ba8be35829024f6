use axum::extract::FromRequest;

use crate::errors::AppError;

/// `axum::Json` with body rejections reported as 400 validation errors.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
