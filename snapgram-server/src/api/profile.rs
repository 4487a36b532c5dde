use axum::{
    extract::{
        multipart::MultipartRejection, rejection::QueryRejection, Multipart, Path, Query, State,
    },
    Extension, Json,
};
use snapgram_types::{FeedPost, User, UserProfile, UserSummary};

use crate::{
    api::{parse_id, ApiError, ApiResult, PageQuery},
    db::repositories::{FollowRepository, PostRepository, UserRepository},
    middleware::AuthUser,
    state::AppState,
    uploads::PendingUpload,
};

/// GET /users/:id - Public profile with counters; email is never included
pub async fn get_user_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
) -> ApiResult<Json<UserProfile>> {
    let user_id = parse_id(&id, "user")?;
    let repo = UserRepository::new(state.db.pool.clone());
    let profile = repo
        .get_profile(user_id, auth.id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(Json(profile))
}

/// GET /users/:id/posts
pub async fn get_user_posts(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(id): Path<String>,
    page: Result<Query<PageQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<FeedPost>>> {
    let user_id = parse_id(&id, "user")?;
    ensure_user_exists(&state, user_id)?;

    let Query(page) = page?;
    let (limit, offset) = page.bounds();
    let repo = PostRepository::new(state.db.pool.clone());
    let posts = repo.get_by_user(user_id, auth.id, limit, offset)?;
    Ok(Json(posts))
}

/// GET /users/:id/followers
pub async fn get_followers(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<UserSummary>>> {
    let user_id = parse_id(&id, "user")?;
    ensure_user_exists(&state, user_id)?;

    let repo = FollowRepository::new(state.db.pool.clone());
    Ok(Json(repo.get_followers(user_id)?))
}

/// GET /users/:id/following
pub async fn get_following(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<UserSummary>>> {
    let user_id = parse_id(&id, "user")?;
    ensure_user_exists(&state, user_id)?;

    let repo = FollowRepository::new(state.db.pool.clone());
    Ok(Json(repo.get_following(user_id)?))
}

/// PUT /users/profile - Update bio and/or profile picture
///
/// Fields that are not sent keep their stored value. A replaced picture is
/// deleted from disk once the new one is saved.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<User>> {
    let mut multipart = multipart?;
    let mut bio: Option<String> = None;
    let mut picture: Option<PendingUpload> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "bio" => {
                bio = Some(field.text().await?.trim().to_string());
            }
            "profile_picture" => {
                if picture.is_some() {
                    return Err(ApiError::BadRequest(
                        "Only one profile picture may be uploaded".to_string(),
                    ));
                }
                picture = Some(state.uploads.read_field(field).await?);
            }
            other => {
                return Err(ApiError::BadRequest(format!("Unexpected field '{}'", other)));
            }
        }
    }

    if bio.is_none() && picture.is_none() {
        return Err(ApiError::BadRequest("Nothing to update".to_string()));
    }

    let repo = UserRepository::new(state.db.pool.clone());
    let previous = repo
        .get_by_id(auth.id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let picture_url = match &picture {
        Some(upload) => Some(state.uploads.store(upload).await?),
        None => None,
    };

    let updated = match repo.update_profile(auth.id, bio.as_deref(), picture_url.as_deref()) {
        Ok(Some(user)) => user,
        Ok(None) => {
            if let Some(url) = &picture_url {
                state.uploads.remove(url).await;
            }
            return Err(ApiError::NotFound("User not found".to_string()));
        }
        Err(e) => {
            if let Some(url) = &picture_url {
                state.uploads.remove(url).await;
            }
            return Err(e.into());
        }
    };

    if let (Some(old), Some(new)) = (&previous.profile_picture, &picture_url) {
        if old != new {
            state.uploads.remove(old).await;
        }
    }

    tracing::info!("User {} updated profile", auth.id);
    Ok(Json(updated))
}

pub(crate) fn ensure_user_exists(state: &AppState, user_id: i64) -> ApiResult<()> {
    let repo = UserRepository::new(state.db.pool.clone());
    match repo.get_by_id(user_id)? {
        Some(_) => Ok(()),
        None => Err(ApiError::NotFound("User not found".to_string())),
    }
}
