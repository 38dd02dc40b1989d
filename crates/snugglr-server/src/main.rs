use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router, middleware,
    routing::{delete, get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use snugglr_api::middleware::require_auth;
use snugglr_api::{AppState, AppStateInner, chats, confessions, matchpool, messages};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "snugglr=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let db_path = std::env::var("SNUGGLR_DB_PATH").unwrap_or_else(|_| "snugglr.db".into());
    let host = std::env::var("SNUGGLR_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("SNUGGLR_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Init database
    let db = snugglr_db::Database::open(&PathBuf::from(&db_path))?;

    let state: AppState = Arc::new(AppStateInner { db });

    // Routes
    let public_routes = Router::new().route("/", get(banner));

    let protected_routes = Router::new()
        .route("/confessions", post(confessions::create_confession))
        .route("/confessions", get(confessions::get_confessions))
        .route(
            "/confessions/{confession_id}/like",
            post(confessions::like_confession),
        )
        .route(
            "/confessions/{confession_id}/comments",
            post(confessions::comment_on_confession),
        )
        .route(
            "/confessions/{confession_id}/comments",
            get(confessions::get_comments),
        )
        .route(
            "/confessions/{confession_id}/comments/{comment_id}/replies",
            post(confessions::reply_to_comment),
        )
        .route(
            "/confessions/{confession_id}/comments/{comment_id}/like",
            post(confessions::like_comment),
        )
        .route("/chats/personal", post(chats::create_personal_chat))
        .route("/chats/group", post(chats::create_group_chat))
        .route("/chats/{chat_id}/messages", get(messages::get_messages))
        .route("/chats/{chat_id}/messages", post(messages::send_message))
        .route("/matchpool/join", post(matchpool::join_pool))
        .route("/matchpool/leave", delete(matchpool::leave_pool))
        .layer(middleware::from_fn(require_auth))
        .with_state(state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Snugglr server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn banner() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "success": true,
        "message": "Snugglr API is running!",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
