use clap::Parser;
use tokenward::cli::{Args, build_config, init_logging, load_secret, open_database};
use tokenward::run_server;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let args = Args::parse();

    init_logging(&args.log_format);

    let Some(access_secret) = load_secret(
        "ACCESS_TOKEN_SECRET",
        args.access_token_secret_file.as_deref(),
    ) else {
        std::process::exit(1);
    };
    let Some(refresh_secret) = load_secret(
        "REFRESH_TOKEN_SECRET",
        args.refresh_token_secret_file.as_deref(),
    ) else {
        std::process::exit(1);
    };

    let Some(db) = open_database(&args.database).await else {
        std::process::exit(1);
    };

    let port = args.port;
    let Some(config) = build_config(args, db, access_secret, refresh_secret) else {
        std::process::exit(1);
    };

    if let Err(e) = config.media.ensure_dirs().await {
        error!(error = %e, "Failed to create media directories");
        std::process::exit(1);
    }

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| {
            error!(address = %addr, error = %e, "Failed to bind");
            std::process::exit(1);
        });

    match listener.local_addr() {
        Ok(local_addr) => info!(address = %local_addr, "Listening"),
        Err(_) => info!(address = %addr, "Listening"),
    }

    if let Err(e) = run_server(config, listener).await {
        error!(error = %e, "Server error");
        std::process::exit(1);
    }
}
