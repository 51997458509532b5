//! Request principal extraction.
//!
//! Authentication happens upstream (reverse proxy or gateway); requests
//! arrive with identity headers already verified. `x-user-id` carries
//! the numeric user id and `x-staff` elevates the principal when set to
//! `1` or `true`. A missing id is 401, a garbled one is 400.

use axum::{
    extract::FromRequestParts,
    http::{request::Parts, StatusCode},
    response::{IntoResponse, Response},
};

use geotrail_core::device::Principal;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const STAFF_HEADER: &str = "x-staff";

/// Extractor wrapper for the verified request principal.
#[derive(Debug, Clone, Copy)]
pub struct CurrentPrincipal(pub Principal);

#[derive(Debug)]
pub enum PrincipalRejection {
    Missing,
    Garbled(String),
}

impl IntoResponse for PrincipalRejection {
    fn into_response(self) -> Response {
        match self {
            Self::Missing => {
                tracing::debug!("Request without identity headers");
                (StatusCode::UNAUTHORIZED, "Missing x-user-id header").into_response()
            }
            Self::Garbled(value) => {
                tracing::warn!(value = %value, "Unparseable x-user-id header");
                (StatusCode::BAD_REQUEST, "Invalid x-user-id header").into_response()
            }
        }
    }
}

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = PrincipalRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or(PrincipalRejection::Missing)?;

        let user_id = raw
            .to_str()
            .ok()
            .and_then(|v| v.trim().parse::<i64>().ok())
            .ok_or_else(|| {
                PrincipalRejection::Garbled(String::from_utf8_lossy(raw.as_bytes()).into_owned())
            })?;

        let is_staff = parts
            .headers
            .get(STAFF_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| matches!(v.trim(), "1" | "true"));

        Ok(CurrentPrincipal(Principal { user_id, is_staff }))
    }
}
