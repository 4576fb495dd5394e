use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{delete, get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use forked_api::auth::{self, AppState, AppStateInner, GitHubConfig};
use forked_api::middleware::{optional_auth, require_auth};
use forked_api::{follows, likes, notifications, posts, users};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "forked=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("FORKED_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("FORKED_DB_PATH").unwrap_or_else(|_| "forked.db".into());
    let host = std::env::var("FORKED_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("FORKED_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let frontend_url =
        std::env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".into());

    let github = GitHubConfig {
        client_id: std::env::var("GITHUB_CLIENT_ID").unwrap_or_default(),
        client_secret: std::env::var("GITHUB_CLIENT_SECRET").unwrap_or_default(),
        callback_url: std::env::var("GITHUB_CALLBACK_URL")
            .unwrap_or_else(|_| "http://localhost:3000/auth/github/callback".into()),
    };

    // Init database
    let db = forked_db::Database::open(&PathBuf::from(&db_path))?;

    // Shared state
    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret,
        github,
        frontend_url: frontend_url.clone(),
        http: reqwest::Client::new(),
    });

    // Routes open to everyone
    let public_routes = Router::new()
        .route("/auth/github", get(auth::github_login))
        .route("/auth/github/callback", get(auth::github_callback))
        .route("/auth/logout", get(auth::logout))
        .route("/api/health", get(health))
        .route("/api/users", get(users::list_users))
        .route("/api/users/search/{query}", get(users::search_users))
        .route("/api/users/{id}", get(users::get_user))
        .route(
            "/api/users/username/{username}",
            get(users::get_user_by_username),
        )
        .route("/api/users/{id}/posts", get(users::user_posts))
        .route("/api/likes/user/{user_id}", get(likes::user_likes))
        .route("/api/likes/post/{post_id}", get(likes::post_likers))
        .with_state(state.clone());

    // Routes that serve both anonymous and authenticated callers; the
    // mutating handlers in here enforce auth themselves.
    let mixed_routes = Router::new()
        .route("/api/posts", get(posts::list_posts).post(posts::create_post))
        .route(
            "/api/posts/{id}",
            get(posts::get_thread).delete(posts::delete_post),
        )
        .route("/api/posts/{id}/like", put(posts::like_post))
        .route("/api/posts/{id}/replies", get(posts::list_replies))
        .route("/api/posts/{id}/forks", get(posts::list_forks))
        .route(
            "/api/follows/{user_id}/followers",
            get(follows::list_followers),
        )
        .route(
            "/api/follows/{user_id}/following",
            get(follows::list_following),
        )
        .layer(middleware::from_fn(optional_auth))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/auth/user", get(auth::current_user))
        .route("/api/users/profile/me", get(users::me))
        .route("/api/users/profile", put(users::update_profile))
        .route(
            "/api/follows/{user_id}",
            post(follows::follow_user).delete(follows::unfollow_user),
        )
        .route("/api/follows/check/{user_id}", get(follows::check_follow))
        .route("/api/likes/my-likes", get(likes::my_likes))
        .route(
            "/api/notifications",
            get(notifications::list_notifications),
        )
        .route(
            "/api/notifications/read-all",
            put(notifications::mark_all_read),
        )
        .route(
            "/api/notifications/unread-count",
            get(notifications::unread_count),
        )
        .route("/api/notifications/{id}/read", put(notifications::mark_read))
        .route(
            "/api/notifications/{id}",
            delete(notifications::delete_notification),
        )
        .layer(middleware::from_fn(require_auth))
        .with_state(state);

    let cors = CorsLayer::new()
        .allow_origin(frontend_url.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let app = Router::new()
        .merge(public_routes)
        .merge(mixed_routes)
        .merge(protected_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Forked server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Forked API is running", "status": "OK" }))
}
