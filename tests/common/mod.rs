#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use tempfile::TempDir;
use tokenward::{
    ServerConfig, create_app,
    db::{Database, NewUser, User},
    jwt::{JwtConfig, TokenSettings},
    media::MediaStore,
};
use tower::ServiceExt;
use url::Url;

pub const ACCESS_SECRET: &[u8] = b"integration-access-secret-0123456789";
pub const REFRESH_SECRET: &[u8] = b"integration-refresh-secret-0123456789";
pub const ACCESS_TTL: u64 = 15 * 60;
pub const REFRESH_TTL: u64 = 10 * 24 * 60 * 60;

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub jwt: JwtConfig,
    pub root: TempDir,
}

pub fn token_settings() -> TokenSettings {
    TokenSettings {
        access_secret: ACCESS_SECRET.to_vec(),
        access_ttl_secs: ACCESS_TTL,
        refresh_secret: REFRESH_SECRET.to_vec(),
        refresh_ttl_secs: REFRESH_TTL,
    }
}

/// Create a test app backed by an in-memory database and a temp media root.
pub async fn create_test_app() -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let root = tempfile::tempdir().expect("Failed to create temp dir");
    let media = MediaStore::new(
        root.path().join("media"),
        root.path().join("temp"),
        Url::parse("http://localhost:8000/").expect("Invalid URL"),
    );
    let config = ServerConfig {
        db: db.clone(),
        tokens: token_settings(),
        secure_cookies: false,
        cookie_domain: None,
        cors_origin: None,
        media,
        bcrypt_cost: 4,
    };
    TestApp {
        app: create_app(&config),
        db,
        jwt: JwtConfig::new(&token_settings()),
        root,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }
}

/// Insert a user directly, bypassing registration.
pub async fn create_user(db: &Database, username: &str, email: &str, password: &str) -> User {
    let input = NewUser {
        uuid: uuid::Uuid::new_v4().to_string(),
        username: username.to_string(),
        email: email.to_string(),
        fullname: format!("{} Example", username),
        avatar: "http://localhost:8000/media/avatar.png".to_string(),
        cover_image: String::new(),
        password_hash: bcrypt::hash(password, 4).unwrap(),
    };
    let id = db.users().create(&input).await.unwrap();
    db.users().get_by_id(id).await.unwrap().unwrap()
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn json_request_with_cookie(
    method: &str,
    uri: &str,
    cookie: &str,
    body: serde_json::Value,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::COOKIE, cookie)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn bearer_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// All Set-Cookie header values of a response.
pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// The Set-Cookie value for a given cookie name.
pub fn find_cookie<'a>(cookies: &'a [String], name: &str) -> Option<&'a str> {
    let prefix = format!("{}=", name);
    cookies
        .iter()
        .find(|c| c.starts_with(&prefix))
        .map(String::as_str)
}

/// The value part of a Set-Cookie header for a given cookie name.
pub fn cookie_value(cookies: &[String], name: &str) -> Option<String> {
    let cookie = find_cookie(cookies, name)?;
    let value = cookie.split(';').next()?.split_once('=')?.1;
    Some(value.to_string())
}

/// Log in through the API and return (access_token, refresh_token).
pub async fn login(app: &TestApp, username: &str, password: &str) -> (String, String) {
    let response = app
        .send(json_request(
            "POST",
            "/api/v1/users/login",
            serde_json::json!({ "username": username, "password": password }),
        ))
        .await;
    assert_eq!(response.status(), 200);
    let json = body_json(response).await;
    (
        json["data"]["accessToken"].as_str().unwrap().to_string(),
        json["data"]["refreshToken"].as_str().unwrap().to_string(),
    )
}

pub const BOUNDARY: &str = "tokenward-test-boundary";

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File(&'a str, &'a str, &'a [u8]),
}

/// Build a multipart/form-data body from text and file parts.
pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name)
                        .as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File(name, file_name, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_request(
    method: &str,
    uri: &str,
    access_token: Option<&str>,
    parts: &[Part<'_>],
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri).header(
        header::CONTENT_TYPE,
        format!("multipart/form-data; boundary={}", BOUNDARY),
    );
    if let Some(token) = access_token {
        builder = builder.header(header::COOKIE, format!("accessToken={}", token));
    }
    builder.body(Body::from(multipart_body(parts))).unwrap()
}
