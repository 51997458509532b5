//! API handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::service::DeviceAccessError;

pub mod cache_admin;
pub mod devices;
pub mod health;
pub mod positions;
pub mod principal;

impl IntoResponse for DeviceAccessError {
    fn into_response(self) -> Response {
        match &self {
            Self::Denied(device_id) => {
                tracing::warn!(device_id = %device_id, "Access denied");
                (StatusCode::FORBIDDEN, self.to_string()).into_response()
            }
            Self::NotFound(device_id) => {
                tracing::debug!(device_id = %device_id, "Device not found");
                (StatusCode::NOT_FOUND, self.to_string()).into_response()
            }
            Self::InvalidWindow(_) => (StatusCode::BAD_REQUEST, self.to_string()).into_response(),
            Self::StaffRequired => {
                tracing::warn!("Staff-only endpoint called by regular user");
                (StatusCode::FORBIDDEN, self.to_string()).into_response()
            }
            Self::Store(err) => {
                tracing::error!(error = %err, "Store error on device endpoint");
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string()).into_response()
            }
        }
    }
}
