use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use snapgram_types::{AuthResponse, LoginRequest, RegisterRequest, User};

use crate::db::repositories::UserRepository;
use crate::middleware::AuthUser;
use crate::state::AppState;
use super::{ApiError, ApiResult};

/// POST /register - Create an account
///
/// Password hashing is CPU-bound, so the credential work runs on the
/// blocking pool.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let Json(payload) = payload?;
    let credentials = state.credentials.clone();

    let response = tokio::task::spawn_blocking(move || {
        credentials.register(&payload.username, &payload.email, &payload.password)
    })
    .await??;

    Ok((StatusCode::CREATED, Json(response)))
}

/// POST /login - Exchange email and password for a token
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<AuthResponse>> {
    let Json(payload) = payload?;
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(ApiError::BadRequest("Email and password are required".to_string()));
    }

    let credentials = state.credentials.clone();
    let response = tokio::task::spawn_blocking(move || {
        credentials.authenticate(&payload.email, &payload.password)
    })
    .await??;

    tracing::info!("User {} logged in", response.id);
    Ok(Json(response))
}

/// GET /users/me - The authenticated user's own account, including email
pub async fn current_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<User>> {
    let repo = UserRepository::new(state.db.pool.clone());
    let user = repo
        .get_by_id(auth.id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(user))
}
