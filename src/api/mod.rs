mod response;
mod tokens;
mod users;

use axum::{Router, body::Body};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

pub use response::{ApiResponse, Empty};
pub use users::UsersState;

/// Upper bound for JSON request bodies.
pub const JSON_BODY_LIMIT: usize = 16 * 1024;

/// Create the API router, mounted under `/api/v1` by the caller.
pub fn create_api_router(state: UsersState) -> Router {
    Router::new().nest(
        "/users",
        users::router().merge(tokens::router()).with_state(state),
    )
}

/// Read a JSON body, reporting failures through the failure envelope.
pub(crate) async fn read_json<T: DeserializeOwned>(body: Body) -> Result<T, ApiError> {
    let bytes = axum::body::to_bytes(body, JSON_BODY_LIMIT)
        .await
        .map_err(|_| ApiError::bad_request("Invalid request body"))?;
    serde_json::from_slice(&bytes).map_err(|_| ApiError::bad_request("Invalid JSON"))
}
