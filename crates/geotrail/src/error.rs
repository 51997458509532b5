use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use geotrail_core::store::StoreError;

/// Boundary error for handlers whose failures are not access decisions.
///
/// Wraps `anyhow::Error` so `?` converts anything on the way out, then
/// inspects the cause when building the response: a position store that
/// cannot be reached or timed out answers 503, anything else is a 500.
pub struct AppError(anyhow::Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self.0.downcast_ref::<StoreError>() {
            Some(err @ (StoreError::Timeout(_) | StoreError::ConnectionFailed(_))) => {
                tracing::error!(error = %err, "Position store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Position store unavailable, try again shortly".to_string(),
                )
                    .into_response()
            }
            _ => {
                tracing::error!(error = %self.0, "Application error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    format!("Something went wrong: {}", self.0),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
