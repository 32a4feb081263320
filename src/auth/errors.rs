//! Authentication error kinds.

use crate::error::ApiError;

/// Message for a request that carried no access token at all.
pub const MSG_UNAUTHORIZED: &str = "Unauthorized request";

/// Message for a token that failed verification or names no known user.
pub const MSG_INVALID_ACCESS_TOKEN: &str = "Invalid access token";

/// Internal auth error kind used by the core authentication logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    NotAuthenticated,
    InvalidToken,
    UserNotFound,
    DatabaseError,
}

impl From<AuthErrorKind> for ApiError {
    // Auth failures leave the cookies alone; the client decides whether to
    // call refresh-token next.
    fn from(kind: AuthErrorKind) -> Self {
        match kind {
            AuthErrorKind::NotAuthenticated => ApiError::unauthorized(MSG_UNAUTHORIZED),
            AuthErrorKind::InvalidToken | AuthErrorKind::UserNotFound => {
                ApiError::unauthorized(MSG_INVALID_ACCESS_TOKEN)
            }
            AuthErrorKind::DatabaseError => ApiError::internal("Database error"),
        }
    }
}
