use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use fortune_core::{ClaimError, MutationError, StoreError};
use fortune_shared::{ApiError, ErrorBody};
use tracing::error;

/// `ApiError` as an HTTP response: status code plus `{"error": "..."}`.
#[derive(Debug)]
pub struct HttpError(pub ApiError);

impl HttpError {
    pub fn status(&self) -> StatusCode {
        match self.0 {
            ApiError::Invalid(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.0.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<ApiError> for HttpError {
    fn from(err: ApiError) -> Self {
        HttpError(err)
    }
}

impl From<StoreError> for HttpError {
    fn from(err: StoreError) -> Self {
        if err.is_transient() {
            return HttpError(ApiError::Unavailable);
        }
        error!(%err, "storage failure");
        HttpError(ApiError::Internal)
    }
}

impl From<ClaimError> for HttpError {
    fn from(err: ClaimError) -> Self {
        match err {
            ClaimError::AlreadyClaimed => HttpError(ApiError::Conflict(err.to_string())),
            ClaimError::StoreUnavailable(_) => HttpError(ApiError::Unavailable),
            // already logged by the allocator
            ClaimError::NoActivePrizes => HttpError(ApiError::Internal),
            ClaimError::Store(inner) => inner.into(),
        }
    }
}

impl From<MutationError> for HttpError {
    fn from(err: MutationError) -> Self {
        let message = err.to_string();
        match err {
            MutationError::Forbidden => HttpError(ApiError::Forbidden(message)),
            MutationError::NotFound { .. } => HttpError(ApiError::NotFound(message)),
            MutationError::Invalid { .. }
            | MutationError::TooManyActive { .. }
            | MutationError::TooFewActive { .. }
            | MutationError::InvalidPermutation { .. } => HttpError(ApiError::Invalid(message)),
            MutationError::SelfRemoval
            | MutationError::LastAdmin
            | MutationError::AlreadyExists { .. } => HttpError(ApiError::Conflict(message)),
            MutationError::Store(inner) => inner.into(),
        }
    }
}
