use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use uuid::Uuid;

use forked_db::models::FollowUserRow;
use forked_types::api::{
    Claims, FollowCheckResponse, FollowResponse, FollowUserEntry, FollowedResponse,
    FollowersResponse, FollowingResponse, MessageResponse, PageQuery,
};
use forked_types::models::NotificationKind;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::OptionalClaims;
use crate::notifications::notify;
use crate::page_meta;

fn ensure_not_self(follower_id: &str, following_id: &str) -> Result<(), ApiError> {
    if follower_id == following_id {
        return Err(ApiError::Validation("You can't follow yourself".into()));
    }
    Ok(())
}

fn follow_user_entry(row: FollowUserRow, following_ids: &[String]) -> FollowUserEntry {
    FollowUserEntry {
        is_following: following_ids.contains(&row.id),
        id: row.id,
        username: row.username,
        display_name: row.display_name,
        avatar_url: row.avatar_url,
        bio: row.bio,
        followers_count: row.followers_count,
        following_count: row.following_count,
        followed_at: row.followed_at,
    }
}

/// Which of the listed users does the caller follow? Empty when anonymous.
fn caller_following(
    state: &AppState,
    auth: &OptionalClaims,
    rows: &[FollowUserRow],
) -> Result<Vec<String>, ApiError> {
    match &auth.0 {
        Some(claims) => {
            let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
            Ok(state.db.filter_following(&claims.sub.to_string(), &ids)?)
        }
        None => Ok(vec![]),
    }
}

/// POST /api/follows/{userId}
pub async fn follow_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<FollowedResponse>, ApiError> {
    let follower_id = claims.sub.to_string();

    ensure_not_self(&follower_id, &user_id)?;

    if state.db.get_user(&user_id)?.is_none() {
        return Err(ApiError::NotFound("User not found".into()));
    }

    if state.db.follow_exists(&follower_id, &user_id)? {
        return Err(ApiError::Validation("Already following this user".into()));
    }

    let row = state
        .db
        .insert_follow(&Uuid::new_v4().to_string(), &follower_id, &user_id)?;
    state.db.adjust_follow_counts(&follower_id, &user_id, 1)?;
    notify(&state.db, &user_id, &follower_id, NotificationKind::Follow, None)?;

    Ok(Json(FollowedResponse {
        message: "Successfully followed user".into(),
        follow: FollowResponse {
            id: row.id,
            follower: row.follower_id,
            following: row.following_id,
            created_at: row.created_at,
        },
    }))
}

/// DELETE /api/follows/{userId}
pub async fn unfollow_user(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MessageResponse>, ApiError> {
    let follower_id = claims.sub.to_string();

    if !state.db.delete_follow(&follower_id, &user_id)? {
        return Err(ApiError::NotFound("Follow relationship not found".into()));
    }

    state.db.adjust_follow_counts(&follower_id, &user_id, -1)?;
    Ok(Json(MessageResponse::new("Successfully unfollowed user")))
}

/// GET /api/follows/{userId}/followers
pub async fn list_followers(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<PageQuery>,
    Extension(auth): Extension<OptionalClaims>,
) -> Result<Json<FollowersResponse>, ApiError> {
    let limit = query.limit.min(200);
    let page = query.page.max(1);
    let offset = (page - 1).saturating_mul(limit);

    let rows = state.db.list_followers(&user_id, limit, offset)?;
    let total = state.db.count_followers(&user_id)? as u64;
    let following_ids = caller_following(&state, &auth, &rows)?;

    Ok(Json(FollowersResponse {
        followers: rows
            .into_iter()
            .map(|row| follow_user_entry(row, &following_ids))
            .collect(),
        pagination: page_meta(page, limit, total),
    }))
}

/// GET /api/follows/{userId}/following
pub async fn list_following(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<PageQuery>,
    Extension(auth): Extension<OptionalClaims>,
) -> Result<Json<FollowingResponse>, ApiError> {
    let limit = query.limit.min(200);
    let page = query.page.max(1);
    let offset = (page - 1).saturating_mul(limit);

    let rows = state.db.list_following(&user_id, limit, offset)?;
    let total = state.db.count_following(&user_id)? as u64;
    let following_ids = caller_following(&state, &auth, &rows)?;

    Ok(Json(FollowingResponse {
        following: rows
            .into_iter()
            .map(|row| follow_user_entry(row, &following_ids))
            .collect(),
        pagination: page_meta(page, limit, total),
    }))
}

/// GET /api/follows/check/{userId}
pub async fn check_follow(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<FollowCheckResponse>, ApiError> {
    let is_following = state
        .db
        .follow_exists(&claims.sub.to_string(), &user_id)?;
    Ok(Json(FollowCheckResponse { is_following }))
}

#[cfg(test)]
mod tests {
    use super::ensure_not_self;

    #[test]
    fn following_yourself_is_rejected() {
        assert!(ensure_not_self("u1", "u1").is_err());
        assert!(ensure_not_self("u1", "u2").is_ok());
    }
}
