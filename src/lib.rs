pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod error;
pub mod jwt;
pub mod media;
pub mod session;

use api::{JSON_BODY_LIMIT, UsersState, create_api_router};
use auth::CookieSettings;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
};
use db::Database;
use jwt::{JwtConfig, TokenSettings};
use media::MediaStore;
use session::SessionManager;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// Signing secrets and lifetimes for both token kinds
    pub tokens: TokenSettings,
    /// Whether to set Secure flag on cookies (should be true in production with HTTPS)
    pub secure_cookies: bool,
    /// Domain attribute for the session cookies
    pub cookie_domain: Option<String>,
    /// Single origin allowed to make credentialed cross-origin requests
    pub cors_origin: Option<HeaderValue>,
    /// Where uploaded images are staged and published
    pub media: MediaStore,
    /// bcrypt work factor for new password hashes
    pub bcrypt_cost: u32,
}

fn cors_layer(origin: Option<&HeaderValue>) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_methods([Method::GET, Method::POST, Method::PATCH]);
    match origin {
        Some(origin) => cors
            .allow_origin(AllowOrigin::exact(origin.clone()))
            .allow_credentials(true),
        // Same-origin only
        None => cors,
    }
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let jwt = Arc::new(JwtConfig::new(&config.tokens));

    let state = UsersState {
        db: config.db.clone(),
        jwt: jwt.clone(),
        sessions: SessionManager::new(config.db.clone(), jwt),
        media: config.media.clone(),
        cookies: CookieSettings {
            secure: config.secure_cookies,
            domain: config.cookie_domain.clone(),
        },
        bcrypt_cost: config.bcrypt_cost,
    };

    Router::new()
        .nest("/api/v1", create_api_router(state))
        .nest_service("/media", ServeDir::new(config.media.media_dir()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(config.cors_origin.as_ref()))
                .layer(DefaultBodyLimit::max(JSON_BODY_LIMIT)),
        )
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    let listener = TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = run_server(config, listener).await {
            tracing::error!(error = %e, "Server error");
        }
    });

    Ok((handle, local_addr))
}
