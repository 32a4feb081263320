//! JWT token generation and validation.
//!
//! Access and refresh tokens are signed with two independent secrets and
//! carry two independent lifetimes. Verification never touches the database.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::db::User;

/// Minimum accepted length for either signing secret.
pub const MIN_SECRET_LENGTH: usize = 32;

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenType {
    /// Short-lived access token - stateless, never compared to stored state
    Access,
    /// Long-lived refresh token - compared against the user's stored slot
    Refresh,
}

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject (user UUID)
    pub sub: String,
    pub username: String,
    pub email: String,
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// JWT claims for refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    /// JWT ID, makes every issued refresh token a distinct string
    pub jti: String,
    /// Subject (user UUID)
    pub sub: String,
    #[serde(rename = "typ")]
    pub token_type: TokenType,
    pub iat: u64,
    pub exp: u64,
}

/// Secrets and lifetimes for both token kinds.
#[derive(Clone)]
pub struct TokenSettings {
    pub access_secret: Vec<u8>,
    pub access_ttl_secs: u64,
    pub refresh_secret: Vec<u8>,
    pub refresh_ttl_secs: u64,
}

impl TokenSettings {
    /// Reject settings that would weaken the dual-secret scheme.
    pub fn validate(&self) -> Result<(), String> {
        if self.access_secret.len() < MIN_SECRET_LENGTH {
            return Err(format!(
                "Access token secret is shorter than {} characters",
                MIN_SECRET_LENGTH
            ));
        }
        if self.refresh_secret.len() < MIN_SECRET_LENGTH {
            return Err(format!(
                "Refresh token secret is shorter than {} characters",
                MIN_SECRET_LENGTH
            ));
        }
        if self.access_secret == self.refresh_secret {
            return Err("Access and refresh token secrets must differ".to_string());
        }
        if self.access_ttl_secs == 0 || self.refresh_ttl_secs == 0 {
            return Err("Token expiry must be greater than zero".to_string());
        }
        Ok(())
    }
}

#[derive(Clone)]
struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        }
    }
}

/// Configuration for JWT operations.
#[derive(Clone)]
pub struct JwtConfig {
    access: KeyPair,
    refresh: KeyPair,
    access_ttl_secs: u64,
    refresh_ttl_secs: u64,
}

/// A freshly signed token.
#[derive(Debug, Clone)]
pub struct SignedToken {
    pub token: String,
    /// Token lifetime in seconds (cookie Max-Age)
    pub duration: u64,
}

fn now_secs() -> Result<u64, JwtError> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .map_err(|_| JwtError::TimeError)
}

fn validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation
}

fn map_decode_error(e: jsonwebtoken::errors::Error) -> JwtError {
    match e.kind() {
        ErrorKind::ExpiredSignature => JwtError::Expired,
        ErrorKind::InvalidSignature => JwtError::BadSignature,
        _ => JwtError::Malformed,
    }
}

impl JwtConfig {
    pub fn new(settings: &TokenSettings) -> Self {
        Self {
            access: KeyPair::new(&settings.access_secret),
            refresh: KeyPair::new(&settings.refresh_secret),
            access_ttl_secs: settings.access_ttl_secs,
            refresh_ttl_secs: settings.refresh_ttl_secs,
        }
    }

    /// Sign an access token for a user with the access secret.
    pub fn sign_access_token(&self, user: &User) -> Result<SignedToken, JwtError> {
        let now = now_secs()?;
        let claims = AccessClaims {
            sub: user.uuid.clone(),
            username: user.username.clone(),
            email: user.email.clone(),
            token_type: TokenType::Access,
            iat: now,
            exp: now + self.access_ttl_secs,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.access.encoding)
            .map_err(JwtError::Encoding)?;

        Ok(SignedToken {
            token,
            duration: self.access_ttl_secs,
        })
    }

    /// Sign a refresh token for a user with the refresh secret.
    pub fn sign_refresh_token(&self, user: &User) -> Result<SignedToken, JwtError> {
        let now = now_secs()?;
        let claims = RefreshClaims {
            jti: uuid::Uuid::new_v4().to_string(),
            sub: user.uuid.clone(),
            token_type: TokenType::Refresh,
            iat: now,
            exp: now + self.refresh_ttl_secs,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.refresh.encoding)
            .map_err(JwtError::Encoding)?;

        Ok(SignedToken {
            token,
            duration: self.refresh_ttl_secs,
        })
    }

    /// Validate and decode an access token.
    pub fn verify_access_token(&self, token: &str) -> Result<AccessClaims, JwtError> {
        let token_data =
            jsonwebtoken::decode::<AccessClaims>(token, &self.access.decoding, &validation())
                .map_err(map_decode_error)?;

        if token_data.claims.token_type != TokenType::Access {
            return Err(JwtError::WrongTokenType);
        }

        Ok(token_data.claims)
    }

    /// Validate and decode a refresh token.
    pub fn verify_refresh_token(&self, token: &str) -> Result<RefreshClaims, JwtError> {
        let token_data =
            jsonwebtoken::decode::<RefreshClaims>(token, &self.refresh.decoding, &validation())
                .map_err(map_decode_error)?;

        if token_data.claims.token_type != TokenType::Refresh {
            return Err(JwtError::WrongTokenType);
        }

        Ok(token_data.claims)
    }
}

/// Errors that can occur during JWT operations.
#[derive(Debug)]
pub enum JwtError {
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// Signature verified but `exp` is in the past
    Expired,
    /// Signed with a different secret or tampered with
    BadSignature,
    /// Not a JWT, bad base64/JSON, missing claims, wrong algorithm
    Malformed,
    /// Wrong token type (e.g., using refresh token as access token)
    WrongTokenType,
    /// System time error
    TimeError,
}

impl std::fmt::Display for JwtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JwtError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            JwtError::Expired => write!(f, "Token has expired"),
            JwtError::BadSignature => write!(f, "Token signature is invalid"),
            JwtError::Malformed => write!(f, "Token is malformed"),
            JwtError::WrongTokenType => write!(f, "Wrong token type"),
            JwtError::TimeError => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for JwtError {}
