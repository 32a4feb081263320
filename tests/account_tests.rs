//! Tests for the authenticated account endpoints.

mod common;

use axum::http::StatusCode;
use common::{
    Part, bearer_request, body_json, create_test_app, create_user, empty_request, json_request,
    json_request_with_cookie, login, multipart_request,
};
use serde_json::json;

#[tokio::test]
async fn test_current_user_via_cookie_and_bearer() {
    let app = create_test_app().await;
    let user = create_user(&app.db, "alice", "alice@example.com", "correct").await;
    let (access, _) = login(&app, "alice", "correct").await;

    let response = app
        .send(empty_request(
            "GET",
            "/api/v1/users/current-user",
            Some(&format!("accessToken={}", access)),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let from_cookie = body_json(response).await;
    assert_eq!(from_cookie["data"]["id"], user.uuid);
    assert_eq!(from_cookie["message"], "Current user fetched successfully");

    let response = app
        .send(bearer_request("GET", "/api/v1/users/current-user", &access))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let from_bearer = body_json(response).await;
    assert_eq!(from_bearer["data"], from_cookie["data"]);
}

#[tokio::test]
async fn test_current_user_without_token() {
    let app = create_test_app().await;

    let response = app
        .send(empty_request("GET", "/api/v1/users/current-user", None))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Unauthorized request");
    assert_eq!(json["errors"], json!([]));
}

#[tokio::test]
async fn test_current_user_for_deleted_account() {
    let app = create_test_app().await;
    let user = create_user(&app.db, "alice", "alice@example.com", "correct").await;
    let (access, _) = login(&app, "alice", "correct").await;

    sqlx::query("DELETE FROM users WHERE id = ?")
        .bind(user.id)
        .execute(app.db.pool())
        .await
        .unwrap();

    let response = app
        .send(bearer_request("GET", "/api/v1/users/current-user", &access))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Invalid access token");
}

#[tokio::test]
async fn test_change_password() {
    let app = create_test_app().await;
    create_user(&app.db, "alice", "alice@example.com", "correct").await;
    let (access, refresh) = login(&app, "alice", "correct").await;
    let cookie = format!("accessToken={}", access);

    let response = app
        .send(json_request_with_cookie(
            "POST",
            "/api/v1/users/change-password",
            &cookie,
            json!({ "oldPassword": "wrong", "newPassword": "better" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Invalid old password");

    let response = app
        .send(json_request_with_cookie(
            "POST",
            "/api/v1/users/change-password",
            &cookie,
            json!({ "oldPassword": "correct", "newPassword": "better" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Password changed successfully");
    assert_eq!(json["data"], json!({}));

    let response = app
        .send(json_request(
            "POST",
            "/api/v1/users/login",
            json!({ "username": "alice", "password": "correct" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // The existing session is not revoked by a password change
    let response = app
        .send(json_request(
            "POST",
            "/api/v1/users/refresh-token",
            json!({ "refreshToken": refresh }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    login(&app, "alice", "better").await;
}

#[tokio::test]
async fn test_change_password_requires_new_password() {
    let app = create_test_app().await;
    create_user(&app.db, "alice", "alice@example.com", "correct").await;
    let (access, _) = login(&app, "alice", "correct").await;

    let response = app
        .send(json_request_with_cookie(
            "POST",
            "/api/v1/users/change-password",
            &format!("accessToken={}", access),
            json!({ "oldPassword": "correct", "newPassword": " " }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_account() {
    let app = create_test_app().await;
    create_user(&app.db, "alice", "alice@example.com", "correct").await;
    let (access, _) = login(&app, "alice", "correct").await;

    let response = app
        .send(json_request_with_cookie(
            "PATCH",
            "/api/v1/users/update-account",
            &format!("accessToken={}", access),
            json!({ "fullname": "Alice Cooper", "email": "Cooper@Example.com" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Account details updated successfully");
    assert_eq!(json["data"]["fullname"], "Alice Cooper");
    assert_eq!(json["data"]["email"], "cooper@example.com");

    let response = app
        .send(json_request(
            "POST",
            "/api/v1/users/login",
            json!({ "email": "cooper@example.com", "password": "correct" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_update_account_validation_and_conflict() {
    let app = create_test_app().await;
    create_user(&app.db, "alice", "alice@example.com", "correct").await;
    create_user(&app.db, "bob", "bob@example.com", "correct").await;
    let (access, _) = login(&app, "alice", "correct").await;
    let cookie = format!("accessToken={}", access);

    let response = app
        .send(json_request_with_cookie(
            "PATCH",
            "/api/v1/users/update-account",
            &cookie,
            json!({ "fullname": "Alice" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["message"], "All fields are required");

    let response = app
        .send(json_request_with_cookie(
            "PATCH",
            "/api/v1/users/update-account",
            &cookie,
            json!({ "fullname": "Alice", "email": "BOB@example.com" }),
        ))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_update_avatar() {
    let app = create_test_app().await;
    let user = create_user(&app.db, "alice", "alice@example.com", "correct").await;
    let (access, _) = login(&app, "alice", "correct").await;

    let response = app
        .send(multipart_request(
            "PATCH",
            "/api/v1/users/avatar",
            Some(&access),
            &[Part::File("avatar", "new.webp", b"new-avatar")],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Avatar image updated successfully");

    let avatar = json["data"]["avatar"].as_str().unwrap();
    assert_ne!(avatar, user.avatar);
    assert!(avatar.ends_with(".webp"));

    let stored = app.db.users().get_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(stored.avatar, avatar);
}

#[tokio::test]
async fn test_update_avatar_missing_file() {
    let app = create_test_app().await;
    create_user(&app.db, "alice", "alice@example.com", "correct").await;
    let (access, _) = login(&app, "alice", "correct").await;

    let response = app
        .send(multipart_request(
            "PATCH",
            "/api/v1/users/avatar",
            Some(&access),
            &[Part::Text("note", "no file here")],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Avatar file is missing");
}

#[tokio::test]
async fn test_update_cover_image() {
    let app = create_test_app().await;
    let user = create_user(&app.db, "alice", "alice@example.com", "correct").await;
    let (access, _) = login(&app, "alice", "correct").await;

    let response = app
        .send(multipart_request(
            "PATCH",
            "/api/v1/users/cover-image",
            Some(&access),
            &[Part::File("coverImage", "wide.jpg", b"cover")],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Cover image updated successfully");

    let stored = app.db.users().get_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(json["data"]["coverImage"], stored.cover_image);
    assert!(stored.cover_image.ends_with(".jpg"));
}

#[tokio::test]
async fn test_upload_requires_auth() {
    let app = create_test_app().await;

    let response = app
        .send(multipart_request(
            "PATCH",
            "/api/v1/users/cover-image",
            None,
            &[Part::File("coverImage", "wide.jpg", b"cover")],
        ))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
