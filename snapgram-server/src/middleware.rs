use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::api::ApiError;
use crate::credentials::Claims;
use crate::state::AppState;

/// Authenticated caller, added to request extensions by [`require_auth`]
#[derive(Clone, Debug, PartialEq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.id,
            username: claims.username,
        }
    }
}

/// Pull the token out of `Authorization: Bearer <token>`.
///
/// A missing header is `Unauthorized`; a header with any other shape is
/// treated as an invalid credential and is `Forbidden`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| ApiError::Unauthorized("Authentication token required".to_string()))?;

    let value = value
        .to_str()
        .map_err(|_| ApiError::Forbidden("Malformed authorization header".to_string()))?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") => Ok(token.trim()),
        _ => Err(ApiError::Forbidden(
            "Authorization header must use the Bearer scheme".to_string(),
        )),
    }
}

/// Middleware to ensure only authenticated users can access certain endpoints
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let claims = {
        let token = bearer_token(request.headers())?;
        state.credentials.verify_token(token)?
    };

    request.extensions_mut().insert(AuthUser::from(claims));
    Ok(next.run(request).await)
}
