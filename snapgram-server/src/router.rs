use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::{api, middleware::require_auth, state::AppState};

/// Headroom above the image ceiling for multipart framing and text fields
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public = Router::new()
        .route("/health", get(health_check))
        .route("/register", post(api::auth::register))
        .route("/login", post(api::auth::login));

    let protected = Router::new()
        // Post routes
        .route("/posts", get(api::posts::get_posts).post(api::posts::create_post))
        .route(
            "/posts/:id",
            get(api::posts::get_post).delete(api::posts::delete_post),
        )
        .route(
            "/posts/:id/like",
            post(api::posts::toggle_like).delete(api::posts::unlike_post),
        )
        .route(
            "/posts/:id/comments",
            get(api::comments::get_comments).post(api::comments::add_comment),
        )
        // User routes
        .route("/users/me", get(api::auth::current_user))
        .route("/users/profile", put(api::profile::update_profile))
        .route("/users/:id", get(api::profile::get_user_profile))
        .route("/users/:id/posts", get(api::profile::get_user_posts))
        .route("/users/:id/followers", get(api::profile::get_followers))
        .route("/users/:id/following", get(api::profile::get_following))
        .route(
            "/users/:id/follow",
            post(api::follows::follow_user).delete(api::follows::unfollow_user),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let uploads = ServeDir::new(state.uploads.dir());
    let public_path = state.uploads.public_path().to_string();
    let body_limit = state.uploads.max_bytes() + MULTIPART_OVERHEAD_BYTES;

    Router::new()
        .merge(public)
        .merge(protected)
        .nest_service(&public_path, uploads)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}
