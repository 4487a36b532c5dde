use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use snapgram_types::{Comment, CreateCommentRequest};

use crate::{
    api::{parse_id, posts::ensure_post_exists, ApiError, ApiResult, PageQuery},
    db::repositories::CommentRepository,
    middleware::AuthUser,
    state::AppState,
};

/// POST /posts/:id/comments
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    payload: Result<Json<CreateCommentRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let post_id = parse_id(&id, "post")?;
    let Json(payload) = payload?;

    let content = payload.content.trim();
    if content.is_empty() {
        return Err(ApiError::BadRequest("Comment cannot be empty".to_string()));
    }

    ensure_post_exists(&state, post_id)?;

    let repo = CommentRepository::new(state.db.pool.clone());
    let comment = repo.create(auth.id, post_id, content)?;

    tracing::info!("User {} commented on post {}", auth.id, post_id);
    Ok((StatusCode::CREATED, Json(comment)))
}

/// GET /posts/:id/comments - Oldest first, so threads read top to bottom
pub async fn get_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
    page: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<Comment>>> {
    let post_id = parse_id(&id, "post")?;
    ensure_post_exists(&state, post_id)?;

    let Query(page) = page?;
    let (limit, offset) = page.bounds();
    let repo = CommentRepository::new(state.db.pool.clone());
    let comments = repo.list_for_post(post_id, limit, offset)?;
    Ok(Json(comments))
}
