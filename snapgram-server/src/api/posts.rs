use axum::{
    extract::{
        multipart::MultipartRejection, rejection::QueryRejection, Multipart, Path, Query, State,
    },
    Extension, Json,
};
use snapgram_types::{FeedPost, LikeAction, LikeResponse, MessageResponse, Post};

use crate::{
    api::{parse_id, ApiError, ApiResult, PageQuery},
    db::repositories::{LikeRepository, PostRepository},
    middleware::AuthUser,
    state::AppState,
    uploads::PendingUpload,
};

/// POST /posts - Create a post from a multipart `image` and optional `caption`
///
/// The image is validated while it is read and only written to disk once the
/// whole body has been accepted. If the row cannot be saved the file is
/// removed again.
pub async fn create_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<Post>> {
    let mut multipart = multipart?;
    let mut image: Option<PendingUpload> = None;
    let mut caption: Option<String> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" => {
                if image.is_some() {
                    return Err(ApiError::BadRequest("Only one image may be uploaded".to_string()));
                }
                image = Some(state.uploads.read_field(field).await?);
            }
            "caption" => {
                let text = field.text().await?;
                let text = text.trim();
                caption = (!text.is_empty()).then(|| text.to_string());
            }
            other => {
                return Err(ApiError::BadRequest(format!("Unexpected field '{}'", other)));
            }
        }
    }

    let image = image.ok_or_else(|| ApiError::BadRequest("An image is required".to_string()))?;
    let image_url = state.uploads.store(&image).await?;

    let repo = PostRepository::new(state.db.pool.clone());
    let post = match repo.create(auth.id, &image_url, caption.as_deref()) {
        Ok(post) => post,
        Err(e) => {
            state.uploads.remove(&image_url).await;
            return Err(e.into());
        }
    };

    tracing::info!("User {} created post {}", auth.id, post.id);
    Ok(Json(post))
}

/// GET /posts - Global feed, newest first
pub async fn get_posts(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    page: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<FeedPost>>> {
    let Query(page) = page?;
    let (limit, offset) = page.bounds();
    let repo = PostRepository::new(state.db.pool.clone());
    let posts = repo.get_feed(auth.id, limit, offset)?;
    Ok(Json(posts))
}

/// GET /posts/:id
pub async fn get_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<FeedPost>> {
    let post_id = parse_id(&id, "post")?;
    let repo = PostRepository::new(state.db.pool.clone());
    let post = repo
        .get_feed_post(post_id, auth.id)?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;
    Ok(Json(post))
}

/// DELETE /posts/:id - Owner only. Likes and comments go with the row.
pub async fn delete_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let post_id = parse_id(&id, "post")?;
    let repo = PostRepository::new(state.db.pool.clone());

    let post = repo
        .get_by_id(post_id)?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;
    if post.user_id != auth.id {
        return Err(ApiError::Forbidden("You can only delete your own posts".to_string()));
    }

    if repo.delete(post_id)? {
        state.uploads.remove(&post.image_url).await;
        tracing::info!("User {} deleted post {}", auth.id, post_id);
    }

    Ok(Json(MessageResponse {
        message: "Post deleted".to_string(),
    }))
}

/// POST /posts/:id/like - Like the post, or take the like back if it exists
pub async fn toggle_like(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<LikeResponse>> {
    let post_id = parse_id(&id, "post")?;

    let likes = LikeRepository::new(state.db.pool.clone());
    let action = likes
        .toggle(auth.id, post_id)?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;
    let like_count = likes.count_for_post(post_id)?;

    tracing::debug!("User {} {} post {}", auth.id, action.as_str(), post_id);
    Ok(Json(LikeResponse { action, like_count }))
}

/// DELETE /posts/:id/like - Remove the caller's like; a no-op if there is none
pub async fn unlike_post(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<LikeResponse>> {
    let post_id = parse_id(&id, "post")?;
    ensure_post_exists(&state, post_id)?;

    let likes = LikeRepository::new(state.db.pool.clone());
    likes.unlike(auth.id, post_id)?;
    let like_count = likes.count_for_post(post_id)?;

    Ok(Json(LikeResponse {
        action: LikeAction::Unliked,
        like_count,
    }))
}

pub(crate) fn ensure_post_exists(state: &AppState, post_id: i64) -> ApiResult<()> {
    let repo = PostRepository::new(state.db.pool.clone());
    if repo.exists(post_id)? {
        Ok(())
    } else {
        Err(ApiError::NotFound("Post not found".to_string()))
    }
}
