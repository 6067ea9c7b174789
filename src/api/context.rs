//! Request identity extraction.
//!
//! Authentication happens upstream (reverse proxy or gateway); by the
//! time a request reaches this service it carries the verified identity
//! in two headers:
//!
//! - `x-user-id`: the caller's UUID
//! - `x-user-role`: `admin`, `responder`, or `reporter`
//!
//! The extractor turns those into a [`RequestContext`] and rejects
//! requests where either header is missing or malformed. Authorization
//! (who may call what) stays in the lifecycle service, not here.

use super::error::ApiError;
use crate::types::{RequestContext, UserId, UserRole};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

/// Header carrying the authenticated user's id.
pub const USER_ID_HEADER: &str = "x-user-id";
/// Header carrying the authenticated user's role.
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing x-user-id header"))?;
        let user_id = Uuid::parse_str(user_id)
            .map_err(|_| ApiError::unauthorized("Invalid x-user-id header"))?;

        let role = parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing x-user-role header"))?;
        let role = UserRole::parse(role)
            .ok_or_else(|| ApiError::unauthorized("Invalid x-user-role header"))?;

        Ok(Self::new(UserId::from_uuid(user_id), role))
    }
}
