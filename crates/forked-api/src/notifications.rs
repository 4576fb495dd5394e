use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use tracing::{error, warn};
use uuid::Uuid;

use forked_db::Database;
use forked_db::models::NotificationRow;
use forked_types::api::{
    AuthorSummary, Claims, MessageResponse, NotificationResponse, NotificationsPage, PageQuery,
    UnreadCountResponse,
};
use forked_types::models::NotificationKind;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::page_meta;

/// Fan-out for follow/reply/fork/like events: one inbox record written
/// synchronously in the triggering request, skipped entirely when the actor
/// is the recipient.
pub(crate) fn notify(
    db: &Database,
    recipient_id: &str,
    sender_id: &str,
    kind: NotificationKind,
    post_id: Option<&str>,
) -> Result<(), ApiError> {
    if recipient_id == sender_id {
        return Ok(());
    }

    db.insert_notification(
        &Uuid::new_v4().to_string(),
        recipient_id,
        sender_id,
        kind.as_str(),
        post_id,
    )?;
    Ok(())
}

fn notification_response(row: NotificationRow) -> NotificationResponse {
    let kind = NotificationKind::parse(&row.kind).unwrap_or_else(|| {
        warn!("Corrupt notification kind '{}' on '{}'", row.kind, row.id);
        NotificationKind::Follow
    });

    NotificationResponse {
        id: row.id,
        sender: AuthorSummary {
            id: row.sender_id,
            username: row.sender_username,
            display_name: row.sender_display_name,
            avatar_url: row.sender_avatar_url,
        },
        kind,
        post_id: row.post_id,
        post_content: row.post_content,
        read: row.read,
        created_at: row.created_at,
    }
}

/// GET /api/notifications
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<NotificationsPage>, ApiError> {
    let db = state.clone();
    let recipient = claims.sub.to_string();
    let limit = query.limit.min(200);
    let page = query.page.max(1);
    let offset = (page - 1).saturating_mul(limit);

    // Run blocking DB reads off the async runtime
    type InboxRows = (Vec<NotificationRow>, i64, i64);
    let (rows, total, unread) = tokio::task::spawn_blocking(move || -> anyhow::Result<InboxRows> {
        let rows = db.db.list_notifications(&recipient, limit, offset)?;
        let total = db.db.count_notifications(&recipient)?;
        let unread = db.db.count_unread(&recipient)?;
        Ok((rows, total, unread))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal("Internal server error".into())
    })??;

    Ok(Json(NotificationsPage {
        notifications: rows.into_iter().map(notification_response).collect(),
        unread_count: unread,
        pagination: page_meta(page, limit, total as u64),
    }))
}

/// PUT /api/notifications/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !state
        .db
        .mark_notification_read(&id, &claims.sub.to_string())?
    {
        return Err(ApiError::NotFound("Notification not found".into()));
    }

    Ok(Json(MessageResponse::new("Notification marked as read")))
}

/// PUT /api/notifications/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.db.mark_all_read(&claims.sub.to_string())?;
    Ok(Json(MessageResponse::new("All notifications marked as read")))
}

/// DELETE /api/notifications/{id}
pub async fn delete_notification(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !state
        .db
        .delete_notification(&id, &claims.sub.to_string())?
    {
        return Err(ApiError::NotFound("Notification not found".into()));
    }

    Ok(Json(MessageResponse::new("Notification deleted")))
}

/// GET /api/notifications/unread-count
pub async fn unread_count(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<UnreadCountResponse>, ApiError> {
    let unread = state.db.count_unread(&claims.sub.to_string())?;
    Ok(Json(UnreadCountResponse {
        unread_count: unread,
    }))
}

#[cfg(test)]
mod tests {
    use super::notify;
    use forked_db::Database;
    use forked_db::models::GithubProfile;
    use forked_types::models::NotificationKind;
    use uuid::Uuid;

    fn open_temp() -> (Database, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open(&dir.path().join("test.db")).unwrap();
        (db, dir)
    }

    fn make_user(db: &Database, github_id: &str, username: &str) -> String {
        db.upsert_github_user(
            &Uuid::new_v4().to_string(),
            &GithubProfile {
                github_id,
                username,
                display_name: None,
                avatar_url: None,
                profile_url: None,
                email: None,
            },
        )
        .unwrap()
        .id
    }

    #[test]
    fn self_notifications_are_skipped() {
        let (db, _dir) = open_temp();
        let alice = make_user(&db, "gh-1", "alice");

        notify(&db, &alice, &alice, NotificationKind::Like, None).unwrap();
        assert_eq!(db.count_notifications(&alice).unwrap(), 0);
    }

    #[test]
    fn cross_user_notifications_are_written() {
        let (db, _dir) = open_temp();
        let alice = make_user(&db, "gh-1", "alice");
        let bob = make_user(&db, "gh-2", "bob");

        notify(&db, &alice, &bob, NotificationKind::Follow, None).unwrap();
        assert_eq!(db.count_notifications(&alice).unwrap(), 1);
        assert_eq!(db.count_unread(&alice).unwrap(), 1);
    }
}
