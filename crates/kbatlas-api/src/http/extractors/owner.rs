//! Caller identity extractor.
//!
//! Reads the owner id from the `X-Owner-Id` header. Authentication itself
//! happens upstream (gateway or auth proxy); this layer only scopes every
//! builder operation to the id it is given.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use kbatlas_types::builder::OwnerId;

use crate::http::error::AppError;

pub const OWNER_HEADER: &str = "x-owner-id";

/// The owner on whose behalf the request runs.
pub struct Owner(pub OwnerId);

impl<S: Send + Sync> FromRequestParts<S> for Owner {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(OWNER_HEADER)
            .ok_or_else(|| AppError::Unauthorized("Missing X-Owner-Id header".to_string()))?;
        let owner = value
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid X-Owner-Id header encoding".to_string()))?
            .trim();
        if owner.is_empty() {
            return Err(AppError::Unauthorized("Empty X-Owner-Id header".to_string()));
        }
        Ok(Owner(OwnerId::new(owner)))
    }
}
