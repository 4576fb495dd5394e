use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};

use forked_db::models::{ProfilePatch, UserRow};
use forked_types::api::{Claims, PageQuery, PostResponse, UpdateProfileRequest, UserResponse};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::posts::post_response;

pub(crate) fn user_response(row: UserRow) -> UserResponse {
    UserResponse {
        id: row.id,
        github_id: row.github_id,
        username: row.username,
        display_name: row.display_name,
        avatar_url: row.avatar_url,
        profile_url: row.profile_url,
        email: row.email,
        bio: row.bio,
        location: row.location,
        website: row.website,
        banner_url: row.banner_url,
        followers_count: row.followers_count,
        following_count: row.following_count,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

/// GET /api/users/search/{query} — case-insensitive, capped at 10 hits.
pub async fn search_users(
    State(state): State<AppState>,
    Path(query): Path<String>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    if query.trim().is_empty() {
        return Ok(Json(vec![]));
    }

    let rows = state.db.search_users(query.trim(), 10)?;
    Ok(Json(rows.into_iter().map(user_response).collect()))
}

/// GET /api/users
pub async fn list_users(
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let rows = state.db.list_users()?;
    Ok(Json(rows.into_iter().map(user_response).collect()))
}

/// GET /api/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .db
        .get_user(&id)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(Json(user_response(user)))
}

/// GET /api/users/username/{username}
pub async fn get_user_by_username(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .db
        .get_user_by_username(&username)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(Json(user_response(user)))
}

/// GET /api/users/{id}/posts
pub async fn user_posts(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let limit = query.limit.min(200);
    let offset = (query.page.max(1) - 1).saturating_mul(limit);

    let rows = state.db.list_posts_by_author(&id, limit, offset)?;
    Ok(Json(rows.into_iter().map(post_response).collect()))
}

/// GET /api/users/profile/me
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .db
        .get_user(&claims.sub.to_string())?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;
    Ok(Json(user_response(user)))
}

/// PUT /api/users/profile — partial update; absent fields are untouched.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let patch = ProfilePatch {
        display_name: req.display_name,
        bio: req.bio,
        location: req.location,
        website: req.website,
        avatar_url: req.avatar_url,
        banner_url: req.banner_url,
    };

    let user = state
        .db
        .update_profile(&claims.sub.to_string(), &patch)?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(user_response(user)))
}
