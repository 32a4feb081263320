//! Access-token verification for protected routes.
//!
//! The access token is read from the `accessToken` cookie, falling back to an
//! `Authorization: Bearer` header. It is verified statelessly with the access
//! secret, then the user it names is looked up fresh. An expired access token
//! is rejected outright; clients renew through the refresh-token route.

mod cookie;
mod errors;
mod extractors;
mod state;
mod types;

pub use cookie::{
    ACCESS_COOKIE_NAME, CookieSettings, REFRESH_COOKIE_NAME, get_bearer_token, get_cookie,
};
pub use errors::{AuthErrorKind, MSG_INVALID_ACCESS_TOKEN, MSG_UNAUTHORIZED};
pub use extractors::{Auth, OptionalAuth, authenticate_request};
pub use state::HasAuthBackend;
pub use types::AuthenticatedUser;
