//! Account endpoints.
//!
//! - POST `/register` - Create an account (multipart, avatar required)
//! - POST `/change-password` - Replace the password after checking the old one
//! - GET `/current-user` - Return the authenticated user
//! - PATCH `/update-account` - Update full name and email
//! - PATCH `/avatar`, `/cover-image` - Replace an uploaded image

use axum::{
    Router,
    extract::{DefaultBodyLimit, Multipart, State},
    response::IntoResponse,
    routing::{get, patch, post},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::read_json;
use super::response::{ApiResponse, Empty};
use crate::auth::{Auth, CookieSettings, MSG_INVALID_ACCESS_TOKEN};
use crate::db::{Database, NewUser, User, is_unique_violation};
use crate::error::{ApiError, ResultExt};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::media::{MediaError, MediaStore};
use crate::session::SessionManager;

/// Upper bound for multipart bodies carrying images.
pub const UPLOAD_BODY_LIMIT: usize = 8 * 1024 * 1024;

const MSG_FIELDS_REQUIRED: &str = "All fields are required";
const MSG_USER_EXISTS: &str = "User with email or username already exists";
const MSG_AVATAR_REQUIRED: &str = "Avatar file is required";

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub sessions: SessionManager,
    pub media: MediaStore,
    pub cookies: CookieSettings,
    pub bcrypt_cost: u32,
}

impl_has_auth_backend!(UsersState);

pub(super) fn router() -> Router<UsersState> {
    Router::new()
        .route(
            "/register",
            post(register).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/change-password", post(change_password))
        .route("/current-user", get(current_user))
        .route("/update-account", patch(update_account))
        .route(
            "/avatar",
            patch(update_avatar).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route(
            "/cover-image",
            patch(update_cover_image).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
}

/// An uploaded file held in memory until validation has passed.
struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

async fn publish(media: &MediaStore, upload: &Upload) -> Result<url::Url, MediaError> {
    let staged = media.stage(&upload.bytes, &upload.file_name).await?;
    media.upload(&staged).await
}

async fn read_file_field(
    field: axum::extract::multipart::Field<'_>,
) -> Result<Option<Upload>, ApiError> {
    let file_name = field.file_name().unwrap_or("").to_string();
    let bytes = field
        .bytes()
        .await
        .map_err(|_| ApiError::bad_request("Failed to read uploaded file"))?;
    if bytes.is_empty() {
        return Ok(None);
    }
    Ok(Some(Upload {
        file_name,
        bytes: bytes.to_vec(),
    }))
}

/// Read a multipart body expected to carry a single file field.
async fn read_single_file(
    mut multipart: Multipart,
    field_name: &str,
) -> Result<Option<Upload>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| ApiError::bad_request("Invalid multipart data"))?
    {
        if field.name() == Some(field_name) {
            return read_file_field(field).await;
        }
    }
    Ok(None)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[derive(Default)]
struct RegisterForm {
    fullname: Option<String>,
    email: Option<String>,
    username: Option<String>,
    password: Option<String>,
    avatar: Option<Upload>,
    cover_image: Option<Upload>,
}

impl RegisterForm {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|_| ApiError::bad_request("Invalid multipart data"))?
        {
            let name = field.name().unwrap_or("").to_string();
            match name.as_str() {
                "avatar" => form.avatar = read_file_field(field).await?,
                "coverImage" => form.cover_image = read_file_field(field).await?,
                "fullname" | "email" | "username" | "password" => {
                    let text = field
                        .text()
                        .await
                        .map_err(|_| ApiError::bad_request(format!("Failed to read {}", name)))?;
                    let slot = match name.as_str() {
                        "fullname" => &mut form.fullname,
                        "email" => &mut form.email,
                        "username" => &mut form.username,
                        _ => &mut form.password,
                    };
                    *slot = Some(text);
                }
                _ => {}
            }
        }

        Ok(form)
    }
}

async fn register(
    State(state): State<UsersState>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = RegisterForm::read(multipart).await?;

    let fullname = non_blank(form.fullname);
    let email = non_blank(form.email).map(|e| e.to_lowercase());
    let username = non_blank(form.username).map(|u| u.to_lowercase());
    // Passwords are taken as typed; only an all-blank one is rejected
    let password = form.password.filter(|p| !p.trim().is_empty());

    let (Some(fullname), Some(email), Some(username), Some(password)) =
        (&fullname, &email, &username, &password)
    else {
        let missing = [
            ("fullname", fullname.is_none()),
            ("email", email.is_none()),
            ("username", username.is_none()),
            ("password", password.is_none()),
        ]
        .into_iter()
        .filter(|(_, is_missing)| *is_missing)
        .map(|(field, _)| format!("{} is required", field))
        .collect();
        return Err(ApiError::validation(MSG_FIELDS_REQUIRED, missing));
    };

    let taken = state
        .db
        .users()
        .exists_by_username_or_email(username, email)
        .await
        .db_err("Failed to check existing users")?;
    if taken {
        return Err(ApiError::conflict(MSG_USER_EXISTS));
    }

    let avatar = form
        .avatar
        .ok_or_else(|| ApiError::bad_request(MSG_AVATAR_REQUIRED))?;
    let avatar_url = publish(&state.media, &avatar).await.map_err(|e| {
        error!(error = %e, "Failed to store avatar");
        ApiError::bad_request(MSG_AVATAR_REQUIRED)
    })?;

    let cover_image_url = match &form.cover_image {
        Some(cover) => match publish(&state.media, cover).await {
            Ok(url) => url.to_string(),
            Err(e) => {
                warn!(error = %e, "Failed to store cover image, continuing without it");
                String::new()
            }
        },
        None => String::new(),
    };

    let password_hash =
        bcrypt::hash(password, state.bcrypt_cost).internal_err("Failed to hash password")?;

    let input = NewUser {
        uuid: uuid::Uuid::new_v4().to_string(),
        username: username.clone(),
        email: email.clone(),
        fullname: fullname.clone(),
        avatar: avatar_url.to_string(),
        cover_image: cover_image_url,
        password_hash,
    };

    // A concurrent registration can still win the race past the existence check
    let id = state.db.users().create(&input).await.map_err(|e| {
        if is_unique_violation(&e) {
            ApiError::conflict(MSG_USER_EXISTS)
        } else {
            ApiError::db_error("Failed to create user", e)
        }
    })?;

    let user = state
        .db
        .users()
        .get_by_id(id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::internal("Something went wrong while registering the user"))?;

    info!(user_id = user.id, username = %user.username, "User registered");
    Ok(ApiResponse::created(user, "User registered successfully"))
}

async fn current_user(Auth(auth): Auth) -> impl IntoResponse {
    ApiResponse::ok(auth.user, "Current user fetched successfully")
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    #[serde(default)]
    old_password: String,
    #[serde(default)]
    new_password: String,
}

/// The refresh token slot is left as is; existing sessions stay valid.
async fn change_password(
    State(state): State<UsersState>,
    Auth(auth): Auth,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let payload: ChangePasswordRequest = read_json(body).await?;

    if payload.new_password.trim().is_empty() {
        return Err(ApiError::bad_request("New password is required"));
    }

    let record = state
        .db
        .users()
        .get_record_by_id(auth.user.id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::unauthorized(MSG_INVALID_ACCESS_TOKEN))?;

    let valid = bcrypt::verify(&payload.old_password, &record.password_hash)
        .internal_err("Failed to verify password")?;
    if !valid {
        return Err(ApiError::bad_request("Invalid old password"));
    }

    let password_hash = bcrypt::hash(&payload.new_password, state.bcrypt_cost)
        .internal_err("Failed to hash password")?;
    state
        .db
        .users()
        .update_password_hash(auth.user.id, &password_hash)
        .await
        .db_err("Failed to update password")?;

    info!(user_id = auth.user.id, "Password changed");
    Ok(ApiResponse::ok(Empty {}, "Password changed successfully"))
}

#[derive(Deserialize)]
struct UpdateAccountRequest {
    #[serde(default)]
    fullname: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

async fn reload_user(db: &Database, id: i64) -> Result<User, ApiError> {
    db.users()
        .get_by_id(id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::unauthorized(MSG_INVALID_ACCESS_TOKEN))
}

async fn update_account(
    State(state): State<UsersState>,
    Auth(auth): Auth,
    body: axum::body::Body,
) -> Result<impl IntoResponse, ApiError> {
    let payload: UpdateAccountRequest = read_json(body).await?;

    let fullname = non_blank(payload.fullname);
    let email = non_blank(payload.email).map(|e| e.to_lowercase());
    let (Some(fullname), Some(email)) = (fullname, email) else {
        return Err(ApiError::bad_request(MSG_FIELDS_REQUIRED));
    };

    state
        .db
        .users()
        .update_account(auth.user.id, &fullname, &email)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                ApiError::conflict("Email is already in use")
            } else {
                ApiError::db_error("Failed to update account", e)
            }
        })?;

    let user = reload_user(&state.db, auth.user.id).await?;
    Ok(ApiResponse::ok(user, "Account details updated successfully"))
}

/// Which image column an upload replaces.
#[derive(Clone, Copy)]
enum ImageSlot {
    Avatar,
    CoverImage,
}

impl ImageSlot {
    fn field_name(self) -> &'static str {
        match self {
            ImageSlot::Avatar => "avatar",
            ImageSlot::CoverImage => "coverImage",
        }
    }

    fn missing_message(self) -> &'static str {
        match self {
            ImageSlot::Avatar => "Avatar file is missing",
            ImageSlot::CoverImage => "Cover image file is missing",
        }
    }

    fn upload_failed_message(self) -> &'static str {
        match self {
            ImageSlot::Avatar => "Error while uploading avatar",
            ImageSlot::CoverImage => "Error while uploading cover image",
        }
    }

    fn success_message(self) -> &'static str {
        match self {
            ImageSlot::Avatar => "Avatar image updated successfully",
            ImageSlot::CoverImage => "Cover image updated successfully",
        }
    }
}

async fn replace_image(
    state: &UsersState,
    user_id: i64,
    multipart: Multipart,
    slot: ImageSlot,
) -> Result<ApiResponse<User>, ApiError> {
    let upload = read_single_file(multipart, slot.field_name())
        .await?
        .ok_or_else(|| ApiError::bad_request(slot.missing_message()))?;

    let url = publish(&state.media, &upload).await.map_err(|e| {
        error!(user_id, error = %e, "Failed to store image");
        ApiError::bad_request(slot.upload_failed_message())
    })?;

    let users = state.db.users();
    let result = match slot {
        ImageSlot::Avatar => users.update_avatar(user_id, url.as_str()).await,
        ImageSlot::CoverImage => users.update_cover_image(user_id, url.as_str()).await,
    };
    result.db_err("Failed to update image")?;

    let user = reload_user(&state.db, user_id).await?;
    Ok(ApiResponse::ok(user, slot.success_message()))
}

async fn update_avatar(
    State(state): State<UsersState>,
    Auth(auth): Auth,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    replace_image(&state, auth.user.id, multipart, ImageSlot::Avatar).await
}

async fn update_cover_image(
    State(state): State<UsersState>,
    Auth(auth): Auth,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    replace_image(&state, auth.user.id, multipart, ImageSlot::CoverImage).await
}
