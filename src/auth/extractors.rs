//! Axum extractors for authentication.

use axum::{extract::FromRequestParts, http::request::Parts};

use super::cookie::{ACCESS_COOKIE_NAME, get_bearer_token, get_cookie};
use super::errors::AuthErrorKind;
use super::state::HasAuthBackend;
use super::types::AuthenticatedUser;
use crate::error::ApiError;

/// Core authentication logic shared by the extractors.
///
/// The cookie wins over the Authorization header when both are present.
pub async fn authenticate_request<S>(
    parts: &Parts,
    state: &S,
) -> Result<AuthenticatedUser, AuthErrorKind>
where
    S: HasAuthBackend + Send + Sync,
{
    let token = get_cookie(&parts.headers, ACCESS_COOKIE_NAME)
        .filter(|t| !t.is_empty())
        .or_else(|| get_bearer_token(&parts.headers))
        .ok_or(AuthErrorKind::NotAuthenticated)?;

    let claims = state.jwt().verify_access_token(token).map_err(|e| {
        tracing::debug!(error = %e, "Access token rejected");
        AuthErrorKind::InvalidToken
    })?;

    let user = state
        .db()
        .users()
        .get_by_uuid(&claims.sub)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get user: {}", e);
            AuthErrorKind::DatabaseError
        })?
        .ok_or(AuthErrorKind::UserNotFound)?;

    Ok(AuthenticatedUser { user, claims })
}

/// Extractor for endpoints that require authentication.
/// Rejects with the JSON failure envelope and leaves cookies untouched.
pub struct Auth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for Auth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        authenticate_request(parts, state)
            .await
            .map(Auth)
            .map_err(ApiError::from)
    }
}

/// Optional authentication extractor - never fails, returns Option<AuthenticatedUser>.
pub struct OptionalAuth(pub Option<AuthenticatedUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalAuth(authenticate_request(parts, state).await.ok()))
    }
}
