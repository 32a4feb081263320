//! Session issuance and rotation.
//!
//! A session is an access/refresh token pair. The only server-side state is
//! the user's single refresh token slot: issuing a session overwrites it,
//! logout clears it, and a refresh must present exactly the stored value.

use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::db::{Database, User};
use crate::error::{ApiError, ResultExt};
use crate::jwt::JwtConfig;

const MSG_ISSUE_FAILED: &str = "Something went wrong while generating refresh and access tokens";
const MSG_UNAUTHORIZED: &str = "Unauthorized request";
const MSG_INVALID_REFRESH: &str = "Invalid refresh token";
const MSG_REFRESH_REUSED: &str = "Refresh token is expired or used";
const MSG_INVALID_CREDENTIALS: &str = "Invalid user credentials";

/// An issued access/refresh pair.
#[derive(Debug, Clone)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token lifetime in seconds
    pub access_max_age: u64,
    /// Refresh token lifetime in seconds
    pub refresh_max_age: u64,
}

/// Login payload. Either identifier may be used.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: String,
}

/// Drop empty/whitespace identifiers and normalize to the stored lowercase form.
fn normalize_identifier(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_lowercase)
}

#[derive(Clone)]
pub struct SessionManager {
    db: Database,
    jwt: Arc<JwtConfig>,
}

impl SessionManager {
    pub fn new(db: Database, jwt: Arc<JwtConfig>) -> Self {
        Self { db, jwt }
    }

    pub fn jwt(&self) -> &JwtConfig {
        &self.jwt
    }

    /// Sign a fresh pair and store the refresh token in the user's slot.
    ///
    /// Tokens are only returned once the slot write has succeeded.
    pub async fn issue_session(&self, user: &User) -> Result<Session, ApiError> {
        let access = self
            .jwt
            .sign_access_token(user)
            .internal_err(MSG_ISSUE_FAILED)?;
        let refresh = self
            .jwt
            .sign_refresh_token(user)
            .internal_err(MSG_ISSUE_FAILED)?;

        let stored = self
            .db
            .users()
            .update_refresh_token(user.id, Some(&refresh.token))
            .await
            .internal_err(MSG_ISSUE_FAILED)?;

        if !stored {
            warn!(user_id = user.id, "User vanished while issuing session");
            return Err(ApiError::internal(MSG_ISSUE_FAILED));
        }

        debug!(user_id = user.id, "Issued session");

        Ok(Session {
            access_token: access.token,
            refresh_token: refresh.token,
            access_max_age: access.duration,
            refresh_max_age: refresh.duration,
        })
    }

    /// Verify credentials and issue a session.
    pub async fn login(&self, request: &LoginRequest) -> Result<(Session, User), ApiError> {
        let username = normalize_identifier(request.username.as_deref());
        let email = normalize_identifier(request.email.as_deref());

        if username.is_none() && email.is_none() {
            return Err(ApiError::bad_request("username or email is required"));
        }

        let record = self
            .db
            .users()
            .find_by_identifier(username.as_deref(), email.as_deref())
            .await
            .db_err("Failed to find user")?
            .ok_or_else(|| ApiError::not_found("User does not exist"))?;

        let password_valid = bcrypt::verify(&request.password, &record.password_hash)
            .internal_err("Failed to verify password")?;

        if !password_valid {
            info!(user_id = record.user.id, "Rejected login with invalid credentials");
            return Err(ApiError::unauthorized(MSG_INVALID_CREDENTIALS));
        }

        let session = self.issue_session(&record.user).await?;
        info!(user_id = record.user.id, "User logged in");

        Ok((session, record.user))
    }

    /// Clear the refresh token slot. Logging out twice is not an error.
    pub async fn logout(&self, user_id: i64) -> Result<(), ApiError> {
        self.db
            .users()
            .update_refresh_token(user_id, None)
            .await
            .db_err("Failed to clear refresh token")?;
        info!(user_id, "User logged out");
        Ok(())
    }

    /// Exchange a refresh token for a new pair, rotating the stored slot.
    pub async fn refresh(&self, incoming: Option<&str>) -> Result<(Session, User), ApiError> {
        let incoming = incoming
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::unauthorized(MSG_UNAUTHORIZED))?;

        let claims = self.jwt.verify_refresh_token(incoming).map_err(|e| {
            debug!(error = %e, "Refresh token failed verification");
            ApiError::unauthorized(MSG_INVALID_REFRESH)
        })?;

        let record = self
            .db
            .users()
            .get_record_by_uuid(&claims.sub)
            .await
            .db_err("Failed to get user")?
            .ok_or_else(|| ApiError::unauthorized(MSG_INVALID_REFRESH))?;

        // Superseded or logged-out tokens still verify; only the slot tells them apart.
        if record.refresh_token.as_deref() != Some(incoming) {
            warn!(user_id = record.user.id, "Rejected superseded refresh token");
            return Err(ApiError::unauthorized(MSG_REFRESH_REUSED));
        }

        let session = self.issue_session(&record.user).await?;
        debug!(user_id = record.user.id, "Rotated session");

        Ok((session, record.user))
    }
}
