//! CLI argument parsing, validation, and startup helpers.

use std::path::PathBuf;

use axum::http::HeaderValue;
use clap::Parser;
use tracing::{error, info, warn};
use url::Url;

use crate::ServerConfig;
use crate::db::Database;
use crate::jwt::TokenSettings;
use crate::media::MediaStore;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tokenward",
    about = "User accounts with rotating JWT sessions"
)]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "8000")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "DATABASE_PATH", default_value = "tokenward.db")]
    pub database: String,

    /// File containing the access token secret. Prefer the ACCESS_TOKEN_SECRET env var
    #[arg(long)]
    pub access_token_secret_file: Option<String>,

    /// File containing the refresh token secret. Prefer the REFRESH_TOKEN_SECRET env var
    #[arg(long)]
    pub refresh_token_secret_file: Option<String>,

    /// Access token lifetime, e.g. "15m", "1d" or plain seconds
    #[arg(long, env = "ACCESS_TOKEN_EXPIRY", default_value = "1d", value_parser = parse_duration)]
    pub access_token_expiry: u64,

    /// Refresh token lifetime, e.g. "10d"
    #[arg(long, env = "REFRESH_TOKEN_EXPIRY", default_value = "10d", value_parser = parse_duration)]
    pub refresh_token_expiry: u64,

    /// Domain attribute for session cookies
    #[arg(long, env = "COOKIE_DOMAIN")]
    pub cookie_domain: Option<String>,

    /// Omit the Secure cookie flag (plain-HTTP local development only)
    #[arg(long)]
    pub insecure_cookies: bool,

    /// Origin allowed to make credentialed cross-origin requests
    #[arg(long, env = "CORS_ORIGIN")]
    pub cors_origin: Option<String>,

    /// Directory published images are stored in
    #[arg(long, env = "MEDIA_DIR", default_value = "public/media")]
    pub media_dir: PathBuf,

    /// Directory uploads are staged in before publishing
    #[arg(long, env = "TEMP_DIR", default_value = "public/temp")]
    pub temp_dir: PathBuf,

    /// Externally visible base URL, used to build media URLs
    #[arg(long, env = "PUBLIC_URL", default_value = "http://localhost:8000")]
    pub public_url: String,

    /// bcrypt work factor
    #[arg(long, env = "BCRYPT_COST", default_value_t = bcrypt::DEFAULT_COST,
        value_parser = clap::value_parser!(u32).range(4..=31))]
    pub bcrypt_cost: u32,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Parse a lifetime such as "30s", "15m", "12h", "10d", "2w" or bare seconds.
pub fn parse_duration(s: &str) -> Result<u64, String> {
    let s = s.trim();
    let (digits, multiplier) = match s.char_indices().last() {
        Some((i, 's')) => (&s[..i], 1),
        Some((i, 'm')) => (&s[..i], 60),
        Some((i, 'h')) => (&s[..i], 60 * 60),
        Some((i, 'd')) => (&s[..i], 24 * 60 * 60),
        Some((i, 'w')) => (&s[..i], 7 * 24 * 60 * 60),
        Some(_) => (s, 1),
        None => return Err("Duration cannot be empty".to_string()),
    };

    let value: u64 = digits
        .parse()
        .map_err(|_| format!("Invalid duration: {}", s))?;
    if value == 0 {
        return Err(format!("Duration must be positive: {}", s));
    }
    value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("Duration is too large: {}", s))
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load a signing secret from an environment variable or a file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_secret(env_var: &str, secret_file: Option<&str>) -> Option<Vec<u8>> {
    if let Ok(secret) = std::env::var(env_var) {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var(env_var) };
        return Some(secret.into_bytes());
    }

    let Some(path) = secret_file else {
        error!(
            "{} is required. Set the environment variable (recommended) or pass a secret file",
            env_var
        );
        return None;
    };

    match std::fs::read_to_string(path) {
        Ok(content) => Some(content.trim().as_bytes().to_vec()),
        Err(e) => {
            error!(path = %path, error = %e, "Failed to read secret file");
            None
        }
    }
}

/// Parse the public URL, normalized to end with '/' so media paths join under it.
pub fn validate_public_url(public_url: &str) -> Option<Url> {
    let mut url = match Url::parse(public_url) {
        Ok(url) => url,
        Err(e) => {
            error!(url = %public_url, error = %e, "Invalid public URL");
            return None;
        }
    };

    if url.cannot_be_a_base() {
        error!(url = %public_url, "Public URL must be an absolute http(s) URL");
        return None;
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Some(url)
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}

/// Build ServerConfig from validated arguments.
/// Returns None and logs an error if any setting is invalid.
pub fn build_config(
    args: Args,
    db: Database,
    access_secret: Vec<u8>,
    refresh_secret: Vec<u8>,
) -> Option<ServerConfig> {
    let tokens = TokenSettings {
        access_secret,
        access_ttl_secs: args.access_token_expiry,
        refresh_secret,
        refresh_ttl_secs: args.refresh_token_expiry,
    };
    if let Err(e) = tokens.validate() {
        error!("{}", e);
        return None;
    }

    let public_url = validate_public_url(&args.public_url)?;

    let cors_origin = match args.cors_origin.as_deref() {
        Some(origin) => match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                error!(origin = %origin, error = %e, "Invalid CORS origin");
                return None;
            }
        },
        None => None,
    };

    let secure_cookies = !args.insecure_cookies;
    if !secure_cookies {
        warn!("Session cookies are sent without the Secure flag");
    }

    Some(ServerConfig {
        db,
        tokens,
        secure_cookies,
        cookie_domain: args.cookie_domain,
        cors_origin,
        media: MediaStore::new(args.media_dir, args.temp_dir, public_url),
        bcrypt_cost: args.bcrypt_cost,
    })
}
