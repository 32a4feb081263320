//! Cookie parsing and formatting for the session token pair.

use axum::http::header;

/// Cookie name for the access token.
pub const ACCESS_COOKIE_NAME: &str = "accessToken";

/// Cookie name for the refresh token.
pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

/// Attributes shared by every session cookie the server sets or clears.
#[derive(Debug, Clone, Default)]
pub struct CookieSettings {
    /// Emit the Secure flag. Only disabled for plain-HTTP local development.
    pub secure: bool,
    /// Optional Domain attribute
    pub domain: Option<String>,
}

impl CookieSettings {
    fn attributes(&self, max_age: u64) -> String {
        let mut attrs = format!("HttpOnly; SameSite=Strict; Path=/; Max-Age={}", max_age);
        if let Some(domain) = &self.domain {
            attrs.push_str("; Domain=");
            attrs.push_str(domain);
        }
        if self.secure {
            attrs.push_str("; Secure");
        }
        attrs
    }

    /// Format a Set-Cookie value carrying a token.
    pub fn build(&self, name: &str, value: &str, max_age: u64) -> String {
        format!("{}={}; {}", name, value, self.attributes(max_age))
    }

    /// Format a Set-Cookie value that removes a cookie. Attributes match `build`.
    pub fn clear(&self, name: &str) -> String {
        format!("{}=; {}", name, self.attributes(0))
    }
}

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a axum::http::HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                return Some(value.trim());
            }
        }
    }
    None
}

/// Extract a bearer token from the Authorization header.
pub fn get_bearer_token(headers: &axum::http::HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}
