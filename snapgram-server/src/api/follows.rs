use axum::{
    extract::{Path, State},
    Extension, Json,
};
use snapgram_types::FollowResponse;

use crate::{
    api::{parse_id, profile::ensure_user_exists, ApiError, ApiResult},
    db::repositories::FollowRepository,
    middleware::AuthUser,
    state::AppState,
};

/// POST /users/:id/follow
pub async fn follow_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<FollowResponse>> {
    let target_id = parse_id(&id, "user")?;
    if target_id == auth.id {
        return Err(ApiError::BadRequest("You cannot follow yourself".to_string()));
    }
    ensure_user_exists(&state, target_id)?;

    let repo = FollowRepository::new(state.db.pool.clone());
    if !repo.follow(auth.id, target_id)? {
        return Err(ApiError::BadRequest("You are already following this user".to_string()));
    }

    tracing::info!("User {} followed {}", auth.id, target_id);
    Ok(Json(FollowResponse {
        message: "Followed user".to_string(),
        following: true,
    }))
}

/// DELETE /users/:id/follow
pub async fn unfollow_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<FollowResponse>> {
    let target_id = parse_id(&id, "user")?;
    ensure_user_exists(&state, target_id)?;

    let repo = FollowRepository::new(state.db.pool.clone());
    if !repo.unfollow(auth.id, target_id)? {
        return Err(ApiError::BadRequest("You are not following this user".to_string()));
    }

    tracing::info!("User {} unfollowed {}", auth.id, target_id);
    Ok(Json(FollowResponse {
        message: "Unfollowed user".to_string(),
        following: false,
    }))
}
