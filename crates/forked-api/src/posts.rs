use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::error;
use uuid::Uuid;

use forked_db::models::PostRow;
use forked_types::api::{
    AuthorSummary, CreatePostRequest, LikeCountResponse, LikeRequest, MessageResponse, PageQuery,
    PostResponse, ThreadResponse,
};
use forked_types::models::{NotificationKind, PostKind, PostStats};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::OptionalClaims;
use crate::notifications::notify;

pub(crate) fn post_response(row: PostRow) -> PostResponse {
    PostResponse {
        id: row.id,
        content: row.content,
        author: AuthorSummary {
            id: row.author_id,
            username: row.author_username,
            display_name: row.author_display_name,
            avatar_url: row.author_avatar_url,
        },
        parent_id: row.parent_id,
        seed_id: row.seed_id,
        kind: row.kind,
        image: row.image,
        stats: PostStats {
            replies: row.replies,
            forks: row.forks,
            likes: row.likes,
            bookmarks: row.bookmarks,
        },
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn validate_content(content: &str) -> Result<(), ApiError> {
    if content.trim().is_empty() {
        return Err(ApiError::Validation("Post content is required".into()));
    }
    if content.chars().count() > 280 {
        return Err(ApiError::Validation(
            "Post content must be 280 characters or less".into(),
        ));
    }
    Ok(())
}

fn ensure_author(post: &PostRow, user_id: &str) -> Result<(), ApiError> {
    if post.author_id != user_id {
        return Err(ApiError::Forbidden("Not authorized".into()));
    }
    Ok(())
}

/// GET /api/posts
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let db = state.clone();
    let limit = query.limit.min(200);
    let offset = (query.page.max(1) - 1).saturating_mul(limit);

    // Run blocking DB reads off the async runtime
    let rows = tokio::task::spawn_blocking(move || db.db.list_posts(limit, offset))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal("Internal server error".into())
        })??;

    Ok(Json(rows.into_iter().map(post_response).collect()))
}

/// GET /api/posts/{id} — the post with its parent and direct branches.
pub async fn get_thread(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<ThreadResponse>, ApiError> {
    let db = state.clone();

    type ThreadRows = (Option<PostRow>, Option<PostRow>, Vec<PostRow>);
    let (post, parent, branches) =
        tokio::task::spawn_blocking(move || -> anyhow::Result<ThreadRows> {
            let Some(post) = db.db.get_post(&post_id)? else {
                return Ok((None, None, vec![]));
            };
            let parent = match &post.parent_id {
                Some(parent_id) => db.db.get_post(parent_id)?,
                None => None,
            };
            let branches = db.db.list_children(&post.id)?;
            Ok((Some(post), parent, branches))
        })
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal("Internal server error".into())
        })??;

    let post = post.ok_or_else(|| ApiError::NotFound("Post not found".into()))?;

    Ok(Json(ThreadResponse {
        post: post_response(post),
        parent: parent.map(post_response),
        branches: branches.into_iter().map(post_response).collect(),
    }))
}

/// POST /api/posts — root post, reply (`parentId`) or fork (`forkedFrom`).
pub async fn create_post(
    State(state): State<AppState>,
    Extension(auth): Extension<OptionalClaims>,
    Json(req): Json<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let claims = auth.require()?;
    validate_content(&req.content)?;

    let author_id = claims.sub.to_string();
    let post_id = Uuid::new_v4().to_string();
    let content = req.content.trim();

    let (kind, parent_ref) = if let Some(forked) = &req.forked_from {
        (PostKind::Fork, Some(forked.as_str()))
    } else if let Some(parent) = &req.parent_id {
        (PostKind::Reply, Some(parent.as_str()))
    } else {
        (PostKind::Root, None)
    };

    match parent_ref {
        Some(parent_id) => {
            let parent = state
                .db
                .get_post(parent_id)?
                .ok_or_else(|| ApiError::NotFound("Parent post not found".into()))?;

            let seed = parent.seed_id.clone().unwrap_or_else(|| parent.id.clone());
            state.db.insert_post(
                &post_id,
                content,
                &author_id,
                Some(parent_id),
                Some(&seed),
                kind.as_str(),
                req.image.as_deref(),
            )?;

            match kind {
                PostKind::Fork => {
                    state.db.bump_fork_count(parent_id)?;
                    notify(&state.db, &parent.author_id, &author_id, NotificationKind::Fork, Some(&post_id))?;
                }
                _ => {
                    state.db.bump_reply_count(parent_id)?;
                    notify(&state.db, &parent.author_id, &author_id, NotificationKind::Reply, Some(&post_id))?;
                }
            }
        }
        None => {
            state.db.insert_post(
                &post_id,
                content,
                &author_id,
                None,
                None,
                kind.as_str(),
                req.image.as_deref(),
            )?;
            // The id does not exist before the first insert, so the
            // self-referencing seed is a second write.
            state.db.set_seed_to_self(&post_id)?;
        }
    }

    let post = state
        .db
        .get_post(&post_id)?
        .ok_or_else(|| ApiError::Internal("Internal server error".into()))?;

    Ok((StatusCode::CREATED, Json(post_response(post))))
}

/// PUT /api/posts/{id}/like — idempotent-intent toggle.
pub async fn like_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Extension(auth): Extension<OptionalClaims>,
    Json(req): Json<LikeRequest>,
) -> Result<Json<LikeCountResponse>, ApiError> {
    let claims = auth.require()?;
    let user_id = claims.sub.to_string();

    let post = state
        .db
        .get_post(&post_id)?
        .ok_or_else(|| ApiError::NotFound("Post not found".into()))?;

    match req.action.as_str() {
        "like" => {
            if state.db.like_exists(&user_id, &post_id)? {
                return Err(ApiError::Validation("Post already liked".into()));
            }
            state
                .db
                .insert_like(&Uuid::new_v4().to_string(), &user_id, &post_id)?;
            notify(&state.db, &post.author_id, &user_id, NotificationKind::Like, Some(&post_id))?;
        }
        "unlike" => {
            state.db.delete_like(&user_id, &post_id)?;
        }
        _ => return Err(ApiError::Validation("Invalid action".into())),
    }

    // Recount rather than increment; the count and the write-back are
    // separate statements.
    let likes = state.db.count_likes(&post_id)?;
    state.db.set_like_count(&post_id, likes)?;

    Ok(Json(LikeCountResponse { likes }))
}

/// DELETE /api/posts/{id} — author only, hard delete.
pub async fn delete_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
    Extension(auth): Extension<OptionalClaims>,
) -> Result<Json<MessageResponse>, ApiError> {
    let claims = auth.require()?;

    let post = state
        .db
        .get_post(&post_id)?
        .ok_or_else(|| ApiError::NotFound("Post not found".into()))?;

    ensure_author(&post, &claims.sub.to_string())?;

    state.db.delete_post(&post_id)?;
    Ok(Json(MessageResponse::new("Post deleted successfully")))
}

/// GET /api/posts/{id}/replies
pub async fn list_replies(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    list_children_of_kind(&state, &post_id, PostKind::Reply)
}

/// GET /api/posts/{id}/forks
pub async fn list_forks(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    list_children_of_kind(&state, &post_id, PostKind::Fork)
}

fn list_children_of_kind(
    state: &AppState,
    post_id: &str,
    kind: PostKind,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    if state.db.get_post(post_id)?.is_none() {
        return Err(ApiError::NotFound("Post not found".into()));
    }

    let rows = state.db.list_children_of_kind(post_id, kind.as_str())?;
    Ok(Json(rows.into_iter().map(post_response).collect()))
}

#[cfg(test)]
mod tests {
    use super::{ensure_author, validate_content};
    use forked_db::models::PostRow;

    fn dummy_post(author_id: &str) -> PostRow {
        PostRow {
            id: "p1".into(),
            content: "hi".into(),
            author_id: author_id.into(),
            parent_id: None,
            seed_id: Some("p1".into()),
            kind: "root".into(),
            image: None,
            replies: 0,
            forks: 0,
            likes: 0,
            bookmarks: 0,
            created_at: String::new(),
            updated_at: String::new(),
            author_username: "alice".into(),
            author_display_name: None,
            author_avatar_url: None,
        }
    }

    #[test]
    fn only_the_author_may_delete() {
        let post = dummy_post("u1");
        assert!(ensure_author(&post, "u1").is_ok());
        assert!(ensure_author(&post, "u2").is_err());
    }

    #[test]
    fn empty_content_is_rejected() {
        assert!(validate_content("").is_err());
        assert!(validate_content("   ").is_err());
    }

    #[test]
    fn content_is_capped_at_280_chars() {
        let ok = "x".repeat(280);
        assert!(validate_content(&ok).is_ok());

        let too_long = "x".repeat(281);
        assert!(validate_content(&too_long).is_err());
    }

    #[test]
    fn cap_counts_chars_not_bytes() {
        let emoji = "🌱".repeat(280);
        assert!(emoji.len() > 280);
        assert!(validate_content(&emoji).is_ok());
    }
}
