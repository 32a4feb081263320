//! Session endpoints.
//!
//! - POST `/login` - Verify credentials and issue a session
//! - POST `/logout` - Clear the refresh token slot and both cookies
//! - POST `/refresh-token` - Exchange a refresh token for a new pair

use axum::{
    Router,
    extract::State,
    http::{HeaderName, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse},
    routing::post,
};
use serde::{Deserialize, Serialize};

use super::response::{ApiResponse, Empty};
use super::users::UsersState;
use super::read_json;
use crate::auth::{ACCESS_COOKIE_NAME, Auth, CookieSettings, REFRESH_COOKIE_NAME, get_cookie};
use crate::db::User;
use crate::error::ApiError;
use crate::session::{LoginRequest, Session};

pub(super) fn router() -> Router<UsersState> {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/refresh-token", post(refresh_token))
}

fn session_cookies(
    cookies: &CookieSettings,
    session: &Session,
) -> AppendHeaders<[(HeaderName, String); 2]> {
    AppendHeaders([
        (
            SET_COOKIE,
            cookies.build(
                ACCESS_COOKIE_NAME,
                &session.access_token,
                session.access_max_age,
            ),
        ),
        (
            SET_COOKIE,
            cookies.build(
                REFRESH_COOKIE_NAME,
                &session.refresh_token,
                session.refresh_max_age,
            ),
        ),
    ])
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    user: User,
    access_token: String,
    refresh_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenPair {
    access_token: String,
    refresh_token: String,
}

async fn login(
    State(state): State<UsersState>,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let payload: LoginRequest = read_json(body).await?;
    let (session, user) = state.sessions.login(&payload).await?;

    Ok((
        session_cookies(&state.cookies, &session),
        ApiResponse::ok(
            LoginResponse {
                user,
                access_token: session.access_token,
                refresh_token: session.refresh_token,
            },
            "User logged In Successfully",
        ),
    ))
}

async fn logout(
    State(state): State<UsersState>,
    Auth(auth): Auth,
) -> Result<impl IntoResponse, ApiError> {
    state.sessions.logout(auth.user.id).await?;

    Ok((
        AppendHeaders([
            (SET_COOKIE, state.cookies.clear(ACCESS_COOKIE_NAME)),
            (SET_COOKIE, state.cookies.clear(REFRESH_COOKIE_NAME)),
        ]),
        ApiResponse::ok(Empty {}, "User logged Out"),
    ))
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    #[serde(default)]
    refresh_token: Option<String>,
}

/// The cookie is preferred; clients without cookie storage send the token in
/// the JSON body instead.
async fn refresh_token(
    State(state): State<UsersState>,
    request: axum::extract::Request,
) -> Result<impl IntoResponse, ApiError> {
    let (parts, body) = request.into_parts();

    let from_cookie = get_cookie(&parts.headers, REFRESH_COOKIE_NAME)
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    let incoming = match from_cookie {
        Some(token) => Some(token),
        // An empty or non-JSON body simply carries no token
        None => read_json::<RefreshRequest>(body)
            .await
            .unwrap_or_default()
            .refresh_token,
    };

    let (session, _user) = state.sessions.refresh(incoming.as_deref()).await?;

    Ok((
        session_cookies(&state.cookies, &session),
        ApiResponse::ok(
            TokenPair {
                access_token: session.access_token,
                refresh_token: session.refresh_token,
            },
            "Access token refreshed",
        ),
    ))
}
