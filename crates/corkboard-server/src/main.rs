use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use corkboard_api::routes;
use corkboard_api::state::AppStateInner;
use corkboard_db::Database;

/// Placeholder signing keys that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "your-secret-key-here",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "corkboard=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let secret_key = std::env::var("CORKBOARD_SECRET_KEY").unwrap_or_default();
    if secret_key.is_empty() || PLACEHOLDER_SECRETS.contains(&secret_key.as_str()) {
        eprintln!("FATAL: CORKBOARD_SECRET_KEY is unset or still a placeholder.");
        eprintln!("       Session cookies are signed with this key.");
        eprintln!("       Set it in your .env file and restart.");
        std::process::exit(1);
    }

    let host = std::env::var("CORKBOARD_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("CORKBOARD_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let db_path: PathBuf = std::env::var("CORKBOARD_DB_PATH")
        .unwrap_or_else(|_| "corkboard.db".into())
        .into();
    let upload_root: PathBuf = std::env::var("CORKBOARD_UPLOAD_DIR")
        .unwrap_or_else(|_| "./uploads".into())
        .into();
    let avatar_size: u32 = std::env::var("CORKBOARD_AVATAR_SIZE")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(corkboard_api::avatar::DEFAULT_AVATAR_SIZE);
    let allowed_extensions: Vec<String> = std::env::var("CORKBOARD_ALLOWED_EXTENSIONS")
        .ok()
        .map(|v| {
            v.split(',')
                .map(|e| e.trim().to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect()
        })
        .unwrap_or_else(corkboard_api::avatar::default_allowed_extensions);
    let max_upload_bytes: usize = std::env::var("CORKBOARD_MAX_UPLOAD_BYTES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(16 * 1024 * 1024); // 16 MiB

    // Init DB, storage and services
    let db = Database::open(&db_path)?;
    let state = Arc::new(AppStateInner::new(
        db,
        upload_root,
        avatar_size,
        allowed_extensions,
        secret_key,
    )?);

    // CORS — permissive; the JSON API is consumed from arbitrary origins
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(false);

    let app = routes::router(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("corkboard listening on {}", addr);
    info!("Avatar output size: {0}x{0}", avatar_size);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
