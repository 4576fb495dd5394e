use axum::{
    Extension, Json,
    extract::{Path, State},
};

use forked_types::api::{AuthorSummary, Claims, LikedPostEntry, PostLikerEntry};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::posts::post_response;

/// GET /api/likes/user/{userId} — posts a user has liked, newest first.
pub async fn user_likes(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<LikedPostEntry>>, ApiError> {
    let rows = state.db.list_likes_by_user(&user_id)?;

    Ok(Json(
        rows.into_iter()
            .map(|row| LikedPostEntry {
                id: row.like_id,
                created_at: row.liked_at,
                post: post_response(row.post),
            })
            .collect(),
    ))
}

/// GET /api/likes/my-likes — just the liked post ids, for status checks.
pub async fn my_likes(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<String>>, ApiError> {
    let ids = state.db.list_liked_post_ids(&claims.sub.to_string())?;
    Ok(Json(ids))
}

/// GET /api/likes/post/{postId} — users who liked a post.
pub async fn post_likers(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<Vec<PostLikerEntry>>, ApiError> {
    let rows = state.db.list_likers(&post_id)?;

    Ok(Json(
        rows.into_iter()
            .map(|row| PostLikerEntry {
                id: row.like_id,
                user: AuthorSummary {
                    id: row.user_id,
                    username: row.username,
                    display_name: row.display_name,
                    avatar_url: row.avatar_url,
                },
                created_at: row.liked_at,
            })
            .collect(),
    ))
}
