//! Caller identity supplied by the upstream authentication layer

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use shared_protocol::Identity;

use crate::error::ApiError;

/// Header carrying the authenticated user id
pub const USER_HEADER: &str = "x-user-id";

/// Identity of an already-authenticated caller
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Identity);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let value = parts
            .headers
            .get(USER_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        Identity::new(value)
            .map(Self)
            .map_err(|_| ApiError::Unauthorized)
    }
}
