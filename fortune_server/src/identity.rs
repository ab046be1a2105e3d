use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap},
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use fortune_core::Identity;
use fortune_shared::ApiError;

use crate::{error::HttpError, AppState};

pub const IDENTITY_ID_HEADER: &str = "x-identity-id";
pub const IDENTITY_NAME_HEADER: &str = "x-identity-name";

/// Caller identity forwarded by the trusted gateway. The gateway proves
/// itself with the shared bearer key; the identity headers are taken as-is.
pub struct Caller(pub Identity);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Caller {
    type Rejection = HttpError;

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| HttpError(ApiError::Unauthorized))?;
        if bearer.token() != state.gateway_key {
            return Err(HttpError(ApiError::Unauthorized));
        }
        identity_from_headers(&parts.headers)
            .map(Caller)
            .ok_or(HttpError(ApiError::Unauthorized))
    }
}

fn identity_from_headers(headers: &HeaderMap) -> Option<Identity> {
    let id = headers
        .get(IDENTITY_ID_HEADER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<i64>()
        .ok()?;
    let name = headers
        .get(IDENTITY_NAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| id.to_string());
    Some(Identity::new(id, name))
}
